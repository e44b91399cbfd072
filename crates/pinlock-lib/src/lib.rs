pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::ResolverOptions;

pub mod directed_graph;
pub use directed_graph::DirectedGraph;

pub mod provider;
pub use provider::Provider;

pub mod reporter;
pub use reporter::Reporter;
pub use reporter::BaseReporter;

pub mod resolver;
pub use resolver::Resolver;
pub use resolver::State;
pub use resolver::ResolutionError;
pub use resolver::RequirementInformation;

pub mod locker;
pub use locker::Locker;
pub use locker::Lock;

pub mod index;
