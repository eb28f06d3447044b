//! Shared harness for end-to-end tests: wires an in-memory instance of every
//! component from spec §2 the same way `fedmem-server`'s `build_backend`
//! does, minus the HTTP/SSE transport, so tests can drive the write
//! pipeline, CMI, domain services and notifier directly.

pub mod harness;
