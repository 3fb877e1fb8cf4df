mod matcher;

pub use matcher::{rewrite_path, CompiledRoute, RouteTable};
