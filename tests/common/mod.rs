// Stub providers and fixtures shared by the integration tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tfsmith::codegen::{CodeGenerator, Reviewer};
use tfsmith::config::GenerationSettings;
use tfsmith::providers::{LlmProvider, ProviderRequest, ProviderResponse, SearchHit, SearchProvider};
use tfsmith::refinement::RefinementLoop;
use tfsmith::research::Researcher;

pub const TIMEOUT: Duration = Duration::from_secs(5);
pub const APPROVE: &str = "The code is valid.";
pub const EC2_RDS_REQUEST: &str = "Create an EC2 instance and an RDS database";

/// One scripted provider reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// A reply queue whose last entry repeats forever.
struct Script {
    replies: VecDeque<Reply>,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "a script needs at least one reply");
        Self {
            replies: replies.into(),
        }
    }

    fn next(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap()
        } else {
            self.replies[0].clone()
        }
    }
}

/// Text generation stub that answers generation and review prompts from
/// separate scripts, telling them apart by the system prompt.
pub struct ScriptedLlm {
    generation: Mutex<Script>,
    review: Mutex<Script>,
    pub generation_prompts: Mutex<Vec<String>>,
    pub review_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(generation: Vec<Reply>, review: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            generation: Mutex::new(Script::new(generation)),
            review: Mutex::new(Script::new(review)),
            generation_prompts: Mutex::new(Vec::new()),
            review_calls: AtomicUsize::new(0),
        })
    }

    pub fn generation_calls(&self) -> usize {
        self.generation_prompts.lock().unwrap().len()
    }

    pub fn review_calls(&self) -> usize {
        self.review_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.generation_calls() + self.review_calls()
    }

    pub fn generation_prompt(&self, index: usize) -> String {
        self.generation_prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let is_review = request
            .messages
            .first()
            .is_some_and(|m| m.content.starts_with("You review"));

        let reply = if is_review {
            self.review_calls.fetch_add(1, Ordering::SeqCst);
            self.review.lock().unwrap().next()
        } else {
            self.generation_prompts.lock().unwrap().push(request.prompt_text());
            self.generation.lock().unwrap().next()
        };

        match reply {
            Reply::Text(text) => Ok(ProviderResponse::text("scripted", text)),
            Reply::Fail => anyhow::bail!("scripted provider failure"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

pub enum SearchMode {
    /// Every query gets a hit derived from the query text
    Echo,
    /// Reply for the n-th call; calls past the end come back empty
    PerCall(Vec<Result<Vec<SearchHit>, String>>),
    /// Every query fails
    Fail,
    /// Every query succeeds with no hits
    Empty,
}

pub struct StubSearch {
    mode: SearchMode,
    pub queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn new(mode: SearchMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.to_string());
            queries.len() - 1
        };

        match &self.mode {
            SearchMode::Echo => Ok(vec![SearchHit::new(
                format!("Guide {}", call),
                format!("https://docs.example.com/{}", call),
                format!("Notes about: {}", query),
            )]),
            SearchMode::PerCall(replies) => match replies.get(call) {
                Some(Ok(hits)) => Ok(hits.clone()),
                Some(Err(message)) => anyhow::bail!("{}", message),
                None => Ok(Vec::new()),
            },
            SearchMode::Fail => anyhow::bail!("search backend unavailable"),
            SearchMode::Empty => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "stub-search"
    }
}

pub fn hit(content: &str) -> SearchHit {
    SearchHit::new("title", "https://docs.example.com", content)
}

pub fn build_loop(llm: Arc<ScriptedLlm>, search: Arc<StubSearch>, max_revisions: u32) -> RefinementLoop {
    let settings = GenerationSettings::default();
    RefinementLoop::new(
        Researcher::new(search, 2, TIMEOUT),
        CodeGenerator::new(llm.clone(), &settings, TIMEOUT),
        Reviewer::new(llm, &settings, TIMEOUT),
        max_revisions,
    )
}

pub fn fenced(code: &str) -> String {
    format!("Here is the configuration:\n\n```hcl\n{}\n```\n", code.trim())
}

pub fn review_issue(issue: &str, fix: &str, severity: &str) -> String {
    serde_json::json!({ "issues": [{ "issue": issue, "fix": fix, "severity": severity }] }).to_string()
}

/// An S3 bucket that passes every local check
pub const BUCKET: &str = r#"
provider "aws" {
  region = var.aws_region
}

variable "aws_region" {
  type    = string
  default = "us-east-1"
}

resource "aws_s3_bucket" "data" {
  bucket_prefix = "data-"
}

output "bucket_arn" {
  value = aws_s3_bucket.data.arn
}
"#;

/// EC2 + RDS with SSH open to the world; otherwise clean
pub const EC2_RDS_OPEN_SSH: &str = r#"
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

resource "aws_security_group" "app" {
  name = "app"

  ingress {
    from_port   = 22
    to_port     = 22
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

resource "aws_instance" "app" {
  ami                    = data.aws_ami.amazon_linux.id
  instance_type          = "t3.micro"
  vpc_security_group_ids = [aws_security_group.app.id]
}

resource "aws_db_subnet_group" "db" {
  name       = "db"
  subnet_ids = ["subnet-aaaa", "subnet-bbbb"]
}

resource "aws_db_instance" "db" {
  engine                 = "postgres"
  instance_class         = "db.t3.micro"
  allocated_storage      = 20
  username               = "app"
  password               = var.db_password
  publicly_accessible    = false
  db_subnet_group_name   = aws_db_subnet_group.db.name
  vpc_security_group_ids = [aws_security_group.app.id]
}

output "instance_id" {
  value = aws_instance.app.id
}

output "db_endpoint" {
  value = aws_db_instance.db.endpoint
}
"#;

/// The same configuration with SSH restricted to a variable CIDR
pub fn ec2_rds_fixed() -> String {
    EC2_RDS_OPEN_SSH
        .replace(
            "cidr_blocks = [\"0.0.0.0/0\"]\n  }\n\n  egress",
            "cidr_blocks = [var.admin_cidr]\n  }\n\n  egress",
        )
        .replace(
            "variable \"db_password\" {",
            "variable \"admin_cidr\" {\n  type    = string\n  default = \"10.0.0.0/16\"\n}\n\nvariable \"db_password\" {",
        )
}
