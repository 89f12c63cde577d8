// Chatguard: outgoing chat message protection
//
// This is the library root. Each module corresponds to one stage a message
// passes through before it leaves the client.

pub mod config;
pub mod filter;
pub mod moderation;
pub mod output;
pub mod pipeline;
pub mod ratelimit;
pub mod verdict;
