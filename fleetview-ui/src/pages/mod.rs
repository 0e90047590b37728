mod nodes;
mod pipelines;
mod service_detail;

pub use nodes::NodesPage;
pub use pipelines::PipelinesPage;
pub use service_detail::ServiceDetailPage;
