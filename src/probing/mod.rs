// Aggregates the identity pool, probe transport, and the staged profiling protocol.

pub mod identities;
pub mod protocol;
pub mod transport;

pub use identities::{ClientHints, ClientIdentity, IdentityPool};
pub use protocol::{DEFAULT_BLOCKING_CODES, ProfileConfig, ProfileResult, RateLimitProfiler};
pub use transport::{
    ProbeOutcome, ProbeTransport, ReqwestProbeTransport, TransportError, execute_probe,
};
