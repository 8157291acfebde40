// Research stage: query planning and corpus aggregation

pub mod catalog;
pub mod query_planner;
pub mod researcher;

pub use catalog::{identify_services, AwsService, CATALOG};
pub use query_planner::{QueryPlan, QueryPlanner};
pub use researcher::{ResearchCorpus, Researcher, Snippet};
