//! External service dependencies injected into the engine.

use aether_adapters::{ConvertService, DimpService, Fetcher, TorchService};

/// The four outbound seams a pipeline run needs. Production wires the
/// HTTP implementations; tests wire the in-memory fakes.
pub struct Services<T, D, V, F> {
    pub torch: T,
    pub dimp: D,
    pub convert: V,
    pub fetcher: F,
}

impl<T, D, V, F> Services<T, D, V, F>
where
    T: TorchService,
    D: DimpService,
    V: ConvertService,
    F: Fetcher,
{
    pub fn new(torch: T, dimp: D, convert: V, fetcher: F) -> Self {
        Self { torch, dimp, convert, fetcher }
    }
}
