pub mod rate_limit;

pub use mediagate_infra::request_id_middleware;
pub use rate_limit::rate_limit_middleware;
