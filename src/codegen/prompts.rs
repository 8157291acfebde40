// Prompt construction for generation and review

use crate::refinement::types::Issue;
use crate::research::{identify_services, ResearchCorpus};

use super::generator::Revision;

/// The sentinel a reviewer model answers with when it has nothing to flag.
pub const APPROVAL_SENTINEL: &str = "The code is valid.";

const GENERATION_RULES: &str = "\
You are an experienced infrastructure engineer writing Terraform for AWS.
Produce one complete, self-contained configuration file that:
- declares the AWS provider with its region taken from a variable
- uses variables for region, instance sizes and resource names, with sensible defaults
- looks up images through data sources (for example the latest Amazon Linux AMI) instead of hard-coding IDs
- creates every resource the request needs together with the resources they structurally depend on
- never opens SSH or RDP to 0.0.0.0/0 and never embeds passwords as literals
- exposes IDs, ARNs and endpoints as outputs
Answer with a single ```hcl fenced block and nothing else.";

const REVIEW_RULES: &str = "\
You review Terraform configurations for AWS. Check the configuration against the request for:
1. correctness: it must be valid HCL that `terraform validate` would accept
2. coverage: every resource the request asks for must be present
3. best practice: security and maintainability conventions for AWS
If everything is fine, answer exactly: The code is valid.
Otherwise answer with JSON only, no prose and no fences:
{\"issues\": [{\"issue\": \"...\", \"fix\": \"...\", \"severity\": \"correctness|coverage|security|style\"}]}";

/// System prompt for generation: rules, research and dependency hints.
pub fn generation_system_prompt(request: &str, corpus: &ResearchCorpus) -> String {
    let mut prompt = String::from(GENERATION_RULES);

    let hints = dependency_hints(request);
    if !hints.is_empty() {
        prompt.push_str("\n\nResources to include:");
        for hint in hints {
            prompt.push_str("\n- ");
            prompt.push_str(&hint);
        }
    }

    if corpus.is_empty() {
        prompt.push_str(
            "\n\nNo research material is available for this request; \
             rely on your knowledge of the current AWS provider.",
        );
    } else {
        prompt.push_str("\n\nResearch material:\n");
        prompt.push_str(&corpus.joined());
    }

    prompt.push_str("\n\nRequest: ");
    prompt.push_str(request.trim());
    prompt
}

/// User turn for generation; a revision carries the previous candidate and
/// the issues raised against it.
pub fn generation_user_prompt(revision: Option<&Revision<'_>>) -> String {
    let Some(revision) = revision else {
        return "Generate the Terraform configuration.".to_string();
    };

    let mut prompt = format!(
        "Your previous configuration was:\n```hcl\n{}\n```\n\nA review found these problems:",
        revision.previous.trim()
    );
    push_numbered_issues(&mut prompt, revision.issues);
    prompt.push_str(
        "\n\nRewrite the complete configuration so that every problem is fixed. \
         Keep everything that was already correct.",
    );
    prompt
}

pub fn review_system_prompt() -> &'static str {
    REVIEW_RULES
}

pub fn review_user_prompt(request: &str, candidate: &str) -> String {
    format!(
        "Request: {}\n\nConfiguration:\n```hcl\n{}\n```",
        request.trim(),
        candidate.trim()
    )
}

/// "aws_db_instance (RDS database) with aws_db_subnet_group, aws_security_group"
fn dependency_hints(request: &str) -> Vec<String> {
    identify_services(request)
        .into_iter()
        .map(|service| {
            let mut hint = format!("{} ({})", service.primary_resource(), service.label());
            if !service.companions.is_empty() {
                hint.push_str(" with ");
                hint.push_str(&service.companions.join(", "));
            }
            hint
        })
        .collect()
}

fn push_numbered_issues(prompt: &mut String, issues: &[Issue]) {
    for (n, issue) in issues.iter().enumerate() {
        prompt.push_str(&format!(
            "\n{}. [{}] {}\n   Fix: {}",
            n + 1,
            issue.severity,
            issue.issue,
            issue.fix
        ));
    }
}
