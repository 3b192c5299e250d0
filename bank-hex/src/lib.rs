//! # Bank Hex
//!
//! Application services, streaming handlers and the HTTP/WebSocket adapter
//! for the bank ledger service.
//!
//! ## Architecture
//!
//! - `service/` - Exchange rate resolver, account ledger and transfer orchestrator
//! - `rpc/` - Transport-agnostic streaming handlers and their error mapping
//! - `inbound/` - HTTP and WebSocket adapter (Axum server)
//!
//! Every service is generic over `R: BankRepository`, allowing different
//! repository implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod rpc;
pub mod service;


pub use service::BankService;
