// Query planner: turns a request into the fixed set of research queries

use serde::Serialize;

use super::catalog::{identify_services, AwsService};
use crate::config::constants::QUERY_COUNT;
use crate::errors::PlanningError;

/// The services found in a request and the queries derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    pub services: Vec<&'static AwsService>,
    queries: [String; QUERY_COUNT],
}

impl QueryPlan {
    /// Exactly [`QUERY_COUNT`] distinct queries, in issue order:
    /// services overview, Terraform resource syntax, best practices.
    pub fn queries(&self) -> &[String] {
        &self.queries
    }
}

/// Derives targeted search queries without calling any provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan_queries(&self, request: &str) -> Result<QueryPlan, PlanningError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(PlanningError::EmptyRequest);
        }

        let services = identify_services(request);
        if services.is_empty() {
            return Err(PlanningError::NoInfrastructureIntent {
                request: request.to_string(),
            });
        }

        let labels = join_natural(services.iter().map(|s| s.label()));
        let syntax_targets = join_natural(
            services
                .iter()
                .map(|s| format!("{} {}", s.name, s.primary_resource())),
        );

        let queries = [
            format!("Terraform AWS {} setup guide", labels),
            format!("Terraform resource block syntax and arguments for {}", syntax_targets),
            format!("Terraform AWS {} security best practices", labels),
        ];

        tracing::debug!(
            services = ?services.iter().map(|s| s.name).collect::<Vec<_>>(),
            "Planned research queries"
        );

        Ok(QueryPlan { services, queries })
    }
}

/// "a", "a and b", "a, b and c"
fn join_natural<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut items: Vec<String> = items.into_iter().collect();
    match items.len() {
        0 => String::new(),
        1 => items.remove(0),
        _ => {
            let last = items.pop().unwrap_or_default();
            format!("{} and {}", items.join(", "), last)
        }
    }
}
