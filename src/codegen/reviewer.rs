// Reviewer: critiques a candidate against syntax, coverage and best practice
//
// Syntax and coverage are checked locally from the scanned block tree. Best
// practice combines a local lint with one review by the text generation
// provider. A candidate is approved only when both sides find nothing.

use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::hcl::{self, Attribute, Block, HclDocument};
use super::prompts::{review_system_prompt, review_user_prompt, APPROVAL_SENTINEL};
use crate::config::constants::REVIEW_ATTEMPTS;
use crate::config::GenerationSettings;
use crate::errors::ReviewError;
use crate::providers::{LlmProvider, Message, ProviderRequest};
use crate::refinement::types::{Critique, Issue, Severity};
use crate::research::identify_services;

const REMOTE_ACCESS_PORTS: &[(u16, &str)] = &[(22, "SSH"), (3389, "RDP")];
const OPEN_CIDRS: &[&str] = &["0.0.0.0/0", "::/0"];
const DATABASE_TYPES: &[&str] = &["aws_db_instance", "aws_rds_cluster", "aws_rds_cluster_instance"];

pub struct Reviewer {
    llm: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    call_timeout: Duration,
}

impl Reviewer {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: &GenerationSettings, call_timeout: Duration) -> Self {
        Self {
            llm,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            call_timeout,
        }
    }

    /// Judge one candidate.
    ///
    /// Fails only when the provider review fails twice and the local checks
    /// found nothing; with local findings in hand those are returned instead.
    pub async fn review(&self, request: &str, candidate: &str) -> Result<Critique, ReviewError> {
        let mut issues = local_issues(request, candidate);

        match self.remote_review(request, candidate).await {
            Ok(remote) => {
                tracing::debug!(local = issues.len(), remote = remote.len(), "Review complete");
                merge_issues(&mut issues, remote);
                Ok(Critique::from_issues(issues))
            }
            Err(e) if !issues.is_empty() => {
                tracing::warn!("Provider review failed, keeping {} local finding(s): {}", issues.len(), e);
                Ok(Critique::from_issues(issues))
            }
            Err(e) => Err(e),
        }
    }

    async fn remote_review(&self, request: &str, candidate: &str) -> Result<Vec<Issue>, ReviewError> {
        let provider_request = ProviderRequest::new(vec![
            Message::system(review_system_prompt()),
            Message::user(review_user_prompt(request, candidate)),
        ])
        .with_model(self.model.clone())
        .with_max_tokens(self.max_tokens)
        .with_temperature(0.0);

        let mut attempt = 1;
        loop {
            let result = match timeout(self.call_timeout, self.llm.send_message(&provider_request)).await {
                Err(_) => Err(ReviewError::Timeout(self.call_timeout)),
                Ok(Err(e)) => Err(ReviewError::Provider(e)),
                Ok(Ok(response)) => parse_review(&response.text),
            };

            match result {
                Ok(issues) => return Ok(issues),
                Err(e) if attempt < REVIEW_ATTEMPTS => {
                    tracing::warn!("Review attempt {}/{} failed: {}", attempt, REVIEW_ATTEMPTS, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Every finding the local checks produce, in check order.
pub fn local_issues(request: &str, candidate: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    match hcl::scan(candidate) {
        Ok(document) => {
            check_structure(&document, &mut issues);
            let present: BTreeSet<&str> = document
                .blocks_of("resource")
                .filter_map(|b| b.label(0))
                .collect();
            check_coverage(request, &present, &mut issues);
            lint(&document, &mut issues);
        }
        Err(e) => {
            issues.push(Issue::new(
                Severity::Correctness,
                format!("The configuration is not well-formed HCL: {}", e),
                "Fix the syntax so that every brace, bracket and string is closed",
            ));
            let present = resource_types_in_text(candidate);
            check_coverage(request, &present, &mut issues);
        }
    }

    issues
}

// ── Syntax ────────────────────────────────────────────────────────────────────

fn check_structure(document: &HclDocument, issues: &mut Vec<Issue>) {
    if document.blocks.is_empty() {
        issues.push(Issue::new(
            Severity::Correctness,
            "The configuration contains no blocks",
            "Declare the provider, variables, resources and outputs as HCL blocks",
        ));
    }

    for attribute in &document.stray_attributes {
        issues.push(Issue::new(
            Severity::Correctness,
            format!(
                "Attribute `{}` on line {} is outside of any block",
                attribute.name, attribute.line
            ),
            "Move it into the block it belongs to, or into a `locals` block",
        ));
    }

    for block in &document.blocks {
        let expected = match block.kind.as_str() {
            "resource" | "data" => 2,
            "variable" | "output" | "provider" | "module" => 1,
            _ => continue,
        };
        if block.labels.len() != expected {
            issues.push(Issue::new(
                Severity::Correctness,
                format!(
                    "`{}` on line {} has {} label(s), expected {}",
                    block.header(),
                    block.line,
                    block.labels.len(),
                    expected
                ),
                format!("Give every `{}` block exactly {} label(s)", block.kind, expected),
            ));
        }
    }

    let declared = document.declared_variables();
    for name in document.variable_references() {
        if !declared.contains(name.as_str()) {
            issues.push(Issue::new(
                Severity::Correctness,
                format!("`var.{}` is referenced but never declared", name),
                format!("Add a `variable \"{}\"` block", name),
            ));
        }
    }

    let has_aws_provider = document
        .blocks_of("provider")
        .any(|b| b.label(0) == Some("aws"));
    if !has_aws_provider {
        issues.push(Issue::new(
            Severity::Coverage,
            "There is no `provider \"aws\"` block",
            "Add a `provider \"aws\"` block with `region = var.aws_region`",
        ));
    }
}

/// Fallback for documents that do not scan: resource types by pattern.
fn resource_types_in_text(source: &str) -> BTreeSet<&str> {
    source
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("resource"))
        .filter_map(|rest| rest.trim_start().strip_prefix('"'))
        .filter_map(|rest| rest.split('"').next())
        .collect()
}

// ── Coverage ──────────────────────────────────────────────────────────────────

fn check_coverage(request: &str, present: &BTreeSet<&str>, issues: &mut Vec<Issue>) {
    let mut reported: HashSet<&str> = HashSet::new();

    for service in identify_services(request) {
        if !service.resource_types.iter().any(|ty| present.contains(ty)) {
            issues.push(Issue::new(
                Severity::Coverage,
                format!(
                    "The request asks for {} but no {} resource is defined",
                    service.label(),
                    service.resource_types.join(" / ")
                ),
                format!("Add a `resource \"{}\"` block", service.primary_resource()),
            ));
        }

        for &companion in service.companions {
            if !present.contains(companion) && reported.insert(companion) {
                issues.push(Issue::new(
                    Severity::Coverage,
                    format!("The {} needs a `{}` resource", service.label(), companion),
                    format!("Add a `resource \"{}\"` block and reference it", companion),
                ));
            }
        }
    }
}

// ── Best practice ─────────────────────────────────────────────────────────────

fn lint(document: &HclDocument, issues: &mut Vec<Issue>) {
    for provider in document.blocks_of("provider").filter(|b| b.label(0) == Some("aws")) {
        if let Some(region) = provider.attribute("region").and_then(Attribute::literal) {
            issues.push(Issue::new(
                Severity::Style,
                format!("The provider region is hard-coded as \"{}\"", region),
                "Declare `variable \"aws_region\"` and use `region = var.aws_region`",
            ));
        }
    }

    if document.blocks_of("variable").next().is_none() {
        issues.push(Issue::new(
            Severity::Style,
            "The configuration declares no variables",
            "Expose region, instance sizes and names as variables with defaults",
        ));
    }

    let mut hard_coded_amis: Vec<&Attribute> = Vec::new();
    for block in &document.blocks {
        collect_attributes(block, &mut |a| {
            if a.literal().is_some_and(|v| v.starts_with("ami-")) {
                hard_coded_amis.push(a);
            }
        });
    }
    for attribute in hard_coded_amis {
        issues.push(Issue::new(
            Severity::Style,
            format!("AMI ID is hard-coded on line {}", attribute.line),
            "Look the image up with a `data \"aws_ami\"` source and reference its id",
        ));
    }

    lint_remote_access(document, issues);
    lint_databases(document, issues);

    for group in document.resources_of_type("aws_security_group") {
        if !has_egress(document, group) {
            issues.push(Issue::new(
                Severity::Style,
                format!("`{}` defines no egress rule", group.header()),
                "Add an explicit `egress` block so outbound traffic is intentional",
            ));
        }
    }

    if document.blocks_of("output").next().is_none() {
        issues.push(Issue::new(
            Severity::Style,
            "The configuration defines no outputs",
            "Add outputs for resource IDs, ARNs and endpoints",
        ));
    }
}

/// Inline `egress` blocks, or a standalone egress rule attached to `group`
/// through its `security_group_id`.
fn has_egress(document: &HclDocument, group: &Block) -> bool {
    if group.blocks_of("egress").next().is_some() {
        return true;
    }
    let Some(name) = group.label(1) else {
        return false;
    };
    let reference = format!("aws_security_group.{}.", name);
    let attached = |rule: &Block| {
        rule.attribute("security_group_id")
            .is_some_and(|a| a.raw.contains(&reference))
    };

    document
        .resources_of_type("aws_security_group_rule")
        .filter(|r| r.attribute("type").and_then(Attribute::literal) == Some("egress"))
        .any(attached)
        || document
            .resources_of_type("aws_vpc_security_group_egress_rule")
            .any(attached)
}

fn collect_attributes<'a>(block: &'a Block, visit: &mut impl FnMut(&'a Attribute)) {
    for attribute in &block.attributes {
        visit(attribute);
    }
    for child in &block.blocks {
        collect_attributes(child, visit);
    }
}

/// SSH or RDP reachable from anywhere, via inline `ingress` blocks or
/// standalone rule resources.
fn lint_remote_access(document: &HclDocument, issues: &mut Vec<Issue>) {
    let mut rules: Vec<(&Block, String)> = Vec::new();

    for group in document.resources_of_type("aws_security_group") {
        for ingress in group.blocks_of("ingress") {
            rules.push((ingress, group.header()));
        }
    }
    for rule in document.resources_of_type("aws_security_group_rule") {
        if rule.attribute("type").and_then(Attribute::literal) == Some("ingress") {
            rules.push((rule, rule.header()));
        }
    }
    for rule in document.resources_of_type("aws_vpc_security_group_ingress_rule") {
        rules.push((rule, rule.header()));
    }

    for (rule, owner) in rules {
        if !is_open_to_world(rule) {
            continue;
        }
        for (port, service) in REMOTE_ACCESS_PORTS {
            if exposes_port(rule, *port) {
                issues.push(Issue::new(
                    Severity::Security,
                    format!("{} on port {} is open to the internet in `{}`", service, port, owner),
                    "Restrict the CIDR to a trusted range taken from a variable, or use SSM Session Manager",
                ));
            }
        }
    }
}

fn is_open_to_world(rule: &Block) -> bool {
    ["cidr_blocks", "ipv6_cidr_blocks", "cidr_ipv4", "cidr_ipv6"]
        .iter()
        .filter_map(|name| rule.attribute(name))
        .any(|a| OPEN_CIDRS.iter().any(|cidr| a.raw.contains(cidr)))
}

fn exposes_port(rule: &Block, port: u16) -> bool {
    let protocol = rule
        .attribute("protocol")
        .or_else(|| rule.attribute("ip_protocol"))
        .map(|a| a.raw.trim_matches('"').to_string());
    if matches!(protocol.as_deref(), Some("-1") | Some("all")) {
        return true;
    }

    let bound = |name: &str| -> Option<u16> {
        rule.attribute(name)
            .and_then(|a| a.raw.trim_matches('"').parse().ok())
    };
    match (bound("from_port"), bound("to_port")) {
        (Some(from), Some(to)) => from <= port && port <= to,
        (Some(single), None) | (None, Some(single)) => single == port,
        // Non-literal ports are not judged
        (None, None) => false,
    }
}

fn lint_databases(document: &HclDocument, issues: &mut Vec<Issue>) {
    for ty in DATABASE_TYPES {
        for db in document.resources_of_type(ty) {
            if db.attribute("publicly_accessible").is_some_and(|a| a.raw == "true") {
                issues.push(Issue::new(
                    Severity::Security,
                    format!("`{}` is publicly accessible", db.header()),
                    "Set `publicly_accessible = false` and reach the database from inside the VPC",
                ));
            }
            for name in ["password", "master_password"] {
                if db.attribute(name).and_then(Attribute::literal).is_some() {
                    issues.push(Issue::new(
                        Severity::Security,
                        format!("`{}` sets `{}` as a literal", db.header(), name),
                        "Take the password from a sensitive variable or use `manage_master_user_password = true`",
                    ));
                }
            }
        }
    }
}

// ── Provider review ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

/// Shape of one issue as returned by the provider; only `issue` is required
#[derive(Debug, Deserialize)]
struct RawIssue {
    issue: String,
    #[serde(default)]
    fix: String,
    #[serde(default)]
    severity: Option<String>,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        let severity = raw
            .severity
            .as_deref()
            .map(Severity::from_label)
            .unwrap_or(Severity::Style);
        Issue::new(severity, raw.issue.trim(), raw.fix.trim())
    }
}

/// Turn a review response into issues; an empty list means approval.
///
/// Anything that is neither the approval sentinel nor a recognizable JSON
/// issue list is an error, never an approval.
pub(crate) fn parse_review(text: &str) -> Result<Vec<Issue>, ReviewError> {
    let stripped = strip_markdown_fences(text);
    if is_approval(stripped) {
        return Ok(Vec::new());
    }

    let candidates = [
        Some(stripped),
        slice_between(stripped, '{', '}'),
        slice_between(stripped, '[', ']'),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(payload) = serde_json::from_str::<ReviewPayload>(candidate) {
            return Ok(convert(payload.issues));
        }
        if let Ok(items) = serde_json::from_str::<Vec<RawIssue>>(candidate) {
            return Ok(convert(items));
        }
    }

    let preview: String = stripped.chars().take(120).collect();
    Err(ReviewError::Unparseable(preview))
}

fn convert(items: Vec<RawIssue>) -> Vec<Issue> {
    items
        .into_iter()
        .filter(|raw| !raw.issue.trim().is_empty())
        .map(Issue::from)
        .collect()
}

/// The reply opens with the approval sentence, possibly quoted, and carries
/// no issue payload after it.
fn is_approval(text: &str) -> bool {
    let unquoted = text
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
        .trim_start()
        .to_ascii_lowercase();
    let sentence = APPROVAL_SENTINEL.trim_end_matches('.').to_ascii_lowercase();
    let Some(rest) = unquoted.strip_prefix(&sentence) else {
        return false;
    };
    let ends_sentence = !rest.starts_with(|c: char| c.is_ascii_alphanumeric());
    ends_sentence && !rest.contains('{') && !rest.contains('[')
}

fn slice_between(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (start < end).then(|| &s[start..=end])
}

/// Strip leading/trailing markdown code fences (```json ... ``` or ``` ... ```)
fn strip_markdown_fences(s: &str) -> &str {
    let s = s.trim();
    let s = if let Some(rest) = s.strip_prefix("```json") {
        rest
    } else if let Some(rest) = s.strip_prefix("```") {
        rest
    } else {
        s
    };
    if let Some(rest) = s.strip_suffix("```") {
        rest.trim()
    } else {
        s.trim()
    }
}

/// Append remote issues not already reported locally.
fn merge_issues(issues: &mut Vec<Issue>, remote: Vec<Issue>) {
    let mut seen: HashSet<String> = issues.iter().map(|i| i.issue.to_lowercase()).collect();
    for issue in remote {
        if seen.insert(issue.issue.to_lowercase()) {
            issues.push(issue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"
provider "aws" {
  region = var.aws_region
}

variable "aws_region" {
  type    = string
  default = "us-east-1"
}

variable "db_password" {
  type      = string
  sensitive = true
}

data "aws_ami" "amazon_linux" {
  most_recent = true
  owners      = ["amazon"]
}

resource "aws_security_group" "web" {
  name = "web"
  ingress {
    from_port   = 443
    to_port     = 443
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
  egress {
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }
}

resource "aws_instance" "web" {
  ami                    = data.aws_ami.amazon_linux.id
  instance_type          = "t3.micro"
  vpc_security_group_ids = [aws_security_group.web.id]
}

resource "aws_db_subnet_group" "db" {
  name       = "db"
  subnet_ids = ["subnet-1", "subnet-2"]
}

resource "aws_db_instance" "db" {
  engine                 = "postgres"
  instance_class         = "db.t3.micro"
  password               = var.db_password
  publicly_accessible    = false
  db_subnet_group_name   = aws_db_subnet_group.db.name
  vpc_security_group_ids = [aws_security_group.web.id]
}

output "instance_id" {
  value = aws_instance.web.id
}
"#;

    const REQUEST: &str = "Create an EC2 instance and an RDS database";

    fn issue_texts(issues: &[Issue]) -> Vec<String> {
        issues.iter().map(|i| i.issue.clone()).collect()
    }

    #[test]
    fn test_clean_configuration_has_no_local_issues() {
        let issues = local_issues(REQUEST, CLEAN);
        assert!(issues.is_empty(), "{:?}", issue_texts(&issues));
    }

    #[test]
    fn test_syntax_error_is_correctness() {
        let broken = CLEAN.replace("output \"instance_id\" {", "output \"instance_id\" {{");
        let issues = local_issues(REQUEST, &broken);
        assert_eq!(issues[0].severity, Severity::Correctness);
        assert!(issues[0].issue.contains("not well-formed"));
    }

    #[test]
    fn test_unscannable_document_still_gets_coverage() {
        let issues = local_issues(REQUEST, "resource \"aws_instance\" \"web\" {\n");
        let texts = issue_texts(&issues);
        assert!(texts.iter().any(|t| t.contains("RDS database")), "{texts:?}");
        assert!(!texts.iter().any(|t| t.contains("EC2 instance but")), "{texts:?}");
    }

    #[test]
    fn test_label_counts() {
        let source = "provider \"aws\" {\n  region = var.r\n}\nvariable \"r\" {}\nresource \"aws_vpc\" {\n}\n";
        let issues = local_issues("a VPC", source);
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Correctness && i.issue.contains("1 label(s), expected 2")));
    }

    #[test]
    fn test_undeclared_variable() {
        let source = CLEAN.replace("var.db_password", "var.database_password");
        let issues = local_issues(REQUEST, &source);
        assert!(issue_texts(&issues).contains(&"`var.database_password` is referenced but never declared".to_string()));
    }

    #[test]
    fn test_commented_variable_mentions_are_ignored() {
        let source = format!("# set var.env in terraform.tfvars\n{}\n/* var.legacy_name */\n", CLEAN);
        let issues = local_issues(REQUEST, &source);
        assert!(issues.is_empty(), "{:?}", issue_texts(&issues));
    }

    #[test]
    fn test_postgres_instance_request_needs_no_server() {
        let source = CLEAN
            .replace("resource \"aws_instance\" \"web\" {\n  ami                    = data.aws_ami.amazon_linux.id\n  instance_type          = \"t3.micro\"\n  vpc_security_group_ids = [aws_security_group.web.id]\n}\n", "")
            .replace("output \"instance_id\" {\n  value = aws_instance.web.id\n}", "output \"db_endpoint\" {\n  value = aws_db_instance.db.endpoint\n}");
        assert!(!source.contains("aws_instance\""));
        let issues = local_issues("Create a PostgreSQL instance", &source);
        assert!(issues.is_empty(), "{:?}", issue_texts(&issues));
    }

    #[test]
    fn test_egress_rule_must_target_its_group() {
        let without_inline = CLEAN.replace(
            "  egress {\n    from_port   = 0\n    to_port     = 0\n    protocol    = \"-1\"\n    cidr_blocks = [\"0.0.0.0/0\"]\n  }\n",
            "",
        );
        let other_group = format!(
            "{}\nresource \"aws_security_group\" \"db\" {{\n  name = \"db\"\n  egress {{\n    from_port   = 0\n    to_port     = 0\n    protocol    = \"-1\"\n    cidr_blocks = [\"10.0.0.0/16\"]\n  }}\n}}\nresource \"aws_vpc_security_group_egress_rule\" \"db_out\" {{\n  security_group_id = aws_security_group.db.id\n  cidr_ipv4         = \"10.0.0.0/16\"\n  ip_protocol       = \"-1\"\n}}\n",
            without_inline
        );
        let issues = local_issues(REQUEST, &other_group);
        assert!(issue_texts(&issues).contains(&"`resource \"aws_security_group\" \"web\"` defines no egress rule".to_string()));

        let attached = format!(
            "{}\nresource \"aws_security_group_rule\" \"web_out\" {{\n  type              = \"egress\"\n  from_port         = 0\n  to_port           = 0\n  protocol          = \"-1\"\n  cidr_blocks       = [\"0.0.0.0/0\"]\n  security_group_id = aws_security_group.web.id\n}}\n",
            without_inline
        );
        let issues = local_issues(REQUEST, &attached);
        assert!(issues.is_empty(), "{:?}", issue_texts(&issues));
    }

    #[test]
    fn test_missing_database_and_companions() {
        let source = r#"
provider "aws" {
  region = var.aws_region
}
variable "aws_region" {}
resource "aws_instance" "web" {
  ami = data.aws_ami.al.id
}
output "id" { value = aws_instance.web.id }
"#;
        let issues = local_issues(REQUEST, source);
        let coverage: Vec<&Issue> = issues.iter().filter(|i| i.severity == Severity::Coverage).collect();
        let texts: Vec<&str> = coverage.iter().map(|i| i.issue.as_str()).collect();
        assert!(texts.iter().any(|t| t.contains("no aws_db_instance / aws_rds_cluster")));
        assert!(texts.iter().any(|t| t.contains("aws_db_subnet_group")));
        // aws_security_group is required by both services but reported once
        assert_eq!(texts.iter().filter(|t| t.contains("aws_security_group")).count(), 1);
    }

    #[test]
    fn test_open_ssh_is_flagged() {
        let source = CLEAN.replace("from_port   = 443\n    to_port     = 443", "from_port   = 22\n    to_port     = 22");
        let issues = local_issues(REQUEST, &source);
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Security && i.issue.starts_with("SSH on port 22")));
    }

    #[test]
    fn test_open_rdp_via_rule_resource() {
        let source = format!(
            "{}\nresource \"aws_security_group_rule\" \"rdp\" {{\n  type        = \"ingress\"\n  from_port   = 3389\n  to_port     = 3389\n  protocol    = \"tcp\"\n  cidr_blocks = [\"0.0.0.0/0\"]\n  security_group_id = aws_security_group.web.id\n}}\n",
            CLEAN
        );
        let issues = local_issues(REQUEST, &source);
        assert!(issues.iter().any(|i| i.issue.starts_with("RDP on port 3389")));
    }

    #[test]
    fn test_database_lints() {
        let source = CLEAN
            .replace("publicly_accessible    = false", "publicly_accessible    = true")
            .replace("password               = var.db_password", "password               = \"hunter22\"");
        let issues = local_issues(REQUEST, &source);
        let security: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == Severity::Security)
            .map(|i| i.issue.as_str())
            .collect();
        assert!(security.iter().any(|t| t.contains("publicly accessible")));
        assert!(security.iter().any(|t| t.contains("sets `password` as a literal")));
    }

    #[test]
    fn test_style_lints() {
        let source = CLEAN
            .replace("region = var.aws_region", "region = \"us-west-2\"")
            .replace("data.aws_ami.amazon_linux.id", "\"ami-0abcdef1234567890\"")
            .replace("output \"instance_id\" {\n  value = aws_instance.web.id\n}", "");
        let issues = local_issues(REQUEST, &source);
        let style: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == Severity::Style)
            .map(|i| i.issue.as_str())
            .collect();
        assert!(style.iter().any(|t| t.contains("region is hard-coded as \"us-west-2\"")));
        assert!(style.iter().any(|t| t.starts_with("AMI ID is hard-coded")));
        assert!(style.iter().any(|t| t.contains("no outputs")));
    }

    #[test]
    fn test_parse_review_sentinel() {
        assert!(parse_review("The code is valid.").unwrap().is_empty());
        assert!(parse_review("  the code is valid\n").unwrap().is_empty());
        assert!(parse_review("\"The code is valid.\"").unwrap().is_empty());
        assert!(parse_review("`The code is valid.`").unwrap().is_empty());
        assert!(parse_review("The code is valid. No issues found.").unwrap().is_empty());
    }

    #[test]
    fn test_sentinel_with_payload_is_not_approval() {
        let reply = "The code is valid, except:\n{\"issues\": [{\"issue\": \"No tags\"}]}";
        assert_eq!(parse_review(reply).unwrap().len(), 1);
        assert!(parse_review("The code is validated against nothing").is_err());
    }

    #[test]
    fn test_parse_review_json_shapes() {
        let object = r#"{"issues": [{"issue": "No tags", "fix": "Add tags", "severity": "style"}]}"#;
        let issues = parse_review(object).unwrap();
        assert_eq!(issues, vec![Issue::new(Severity::Style, "No tags", "Add tags")]);

        let fenced = "```json\n[{\"issue\": \"Bad ref\", \"fix\": \"Fix it\", \"severity\": \"correctness\"}]\n```";
        assert_eq!(parse_review(fenced).unwrap()[0].severity, Severity::Correctness);

        let chatty = "Here is my review:\n{\"issues\": [{\"issue\": \"x\"}]}\nThanks!";
        assert_eq!(parse_review(chatty).unwrap().len(), 1);

        assert!(parse_review(r#"{"issues": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_review_rejects_prose() {
        assert!(matches!(
            parse_review("Looks mostly fine to me, maybe add tags?"),
            Err(ReviewError::Unparseable(_))
        ));
        assert!(parse_review("").is_err());
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut issues = vec![Issue::new(Severity::Style, "No outputs", "add")];
        merge_issues(
            &mut issues,
            vec![
                Issue::new(Severity::Style, "no outputs", "add some"),
                Issue::new(Severity::Security, "Unencrypted storage", "encrypt"),
            ],
        );
        assert_eq!(issues.len(), 2);
    }
}
