pub mod netimoveis;
pub mod olx;
pub mod parsing;
pub mod traits;
pub mod types;
pub mod viva_real;
pub mod zap_imoveis;

use std::sync::Arc;

use crate::models::Origin;

pub use netimoveis::NetImoveisAdapter;
pub use olx::OlxAdapter;
pub use traits::SourceAdapter;
pub use types::{NextPageCheck, PageExtraction};
pub use viva_real::VivaRealAdapter;
pub use zap_imoveis::ZapImoveisAdapter;

/// The adapter that knows how to crawl `origin`.
pub fn adapter_for(origin: Origin) -> Arc<dyn SourceAdapter> {
    match origin {
        Origin::Olx => Arc::new(OlxAdapter),
        Origin::VivaReal => Arc::new(VivaRealAdapter),
        Origin::ZapImoveis => Arc::new(ZapImoveisAdapter),
        Origin::NetImoveis => Arc::new(NetImoveisAdapter),
    }
}
