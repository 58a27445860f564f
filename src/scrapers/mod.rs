mod contra;
mod flexjobs;
mod remote_co;
mod remotive;
mod toptal;
mod weworkremotely;

pub use contra::ContraScraper;
pub use flexjobs::FlexJobsScraper;
pub use remote_co::RemoteCoScraper;
pub use remotive::RemotiveScraper;
pub use toptal::ToptalScraper;
pub use weworkremotely::WeWorkRemotelyScraper;

use crate::source_adapter::AdapterRegistry;
use std::sync::Arc;

/// Registry holding every implemented scraper, in default visiting order
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(FlexJobsScraper));
    registry.register(Arc::new(RemotiveScraper));
    registry.register(Arc::new(WeWorkRemotelyScraper));
    registry.register(Arc::new(RemoteCoScraper));
    registry.register(Arc::new(ContraScraper));
    registry.register(Arc::new(ToptalScraper));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    #[test]
    fn test_default_registry_covers_scraped_platforms() {
        assert_eq!(default_registry().platforms(), Platform::SCRAPED.to_vec());
    }
}
