pub mod client;
pub mod editable;
pub mod management;
pub mod region;

pub use client::{ContentStore, DeliveryClient, EntryQuery, PreviewContext};
pub use management::{EntryDetails, ManagementApi, ManagementClient};
pub use region::{Endpoints, Region};
