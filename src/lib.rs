// Wallet core exposed to C through a flat boundary: opaque handles,
// owned buffers, and function-pointer records. Domain modules hold the
// behavior; the ownership contract lives in ffi.rs.

pub mod address;
pub mod base58;
pub mod ffi;
pub mod network;
pub mod script;
pub mod wallet;

/// Bumped whenever the C surface changes shape.
pub const ABI_VERSION: u32 = 1;

/*
Intentionally avoids:
- async
- threads
- external IO
- process-global state (the error channel is per-thread)
*/
