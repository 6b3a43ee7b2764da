pub mod logging;
pub mod request;
pub mod site;

pub use request::{FakeEntity, FakeRequest};
pub use site::{BANNER_FIELD, FailingCache, REGIONS_FIELD, TestSite};
