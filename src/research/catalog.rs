// AWS service catalog
//
// Maps request vocabulary to AWS services and the Terraform resource types
// that implement them. Shared by the query planner (what to search for),
// the generator prompt (structural dependencies) and the reviewer
// (coverage rubric).

use serde::Serialize;

/// A word or phrase that signals a service in a request.
#[derive(Debug, Clone, Copy)]
pub struct Keyword {
    phrase: &'static str,
    /// The keyword does not count when the word right before it is one of these
    unless_after: &'static [&'static str],
}

impl Keyword {
    const fn new(phrase: &'static str) -> Self {
        Self {
            phrase,
            unless_after: &[],
        }
    }

    const fn unless_after(self, words: &'static [&'static str]) -> Self {
        Self {
            phrase: self.phrase,
            unless_after: words,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AwsService {
    /// Short service name used in queries, e.g. "RDS"
    pub name: &'static str,
    /// What the user gets, e.g. "database"
    pub noun: &'static str,
    #[serde(skip)]
    keywords: &'static [Keyword],
    /// Any one of these satisfies coverage for the service
    pub resource_types: &'static [&'static str],
    /// Resources the service structurally depends on; all must be present
    pub companions: &'static [&'static str],
}

impl AwsService {
    /// The resource type to show in syntax queries
    pub fn primary_resource(&self) -> &'static str {
        self.resource_types[0]
    }

    /// e.g. "RDS database"
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.noun)
    }
}

/// Words that make a following "instance" a database or cache node rather than a server
const DB_QUALIFIERS: &[&str] = &[
    "rds",
    "db",
    "database",
    "postgres",
    "postgresql",
    "mysql",
    "mariadb",
    "aurora",
    "elasticache",
    "redis",
    "memcached",
    "cache",
];

pub static CATALOG: &[AwsService] = &[
    AwsService {
        name: "VPC",
        noun: "network",
        keywords: &[
            Keyword::new("vpc"),
            Keyword::new("subnet"),
            Keyword::new("network"),
            Keyword::new("internet gateway"),
            Keyword::new("nat gateway"),
            Keyword::new("route table"),
        ],
        resource_types: &["aws_vpc"],
        companions: &["aws_subnet"],
    },
    AwsService {
        name: "EC2",
        noun: "instance",
        keywords: &[
            Keyword::new("ec2"),
            Keyword::new("instance").unless_after(DB_QUALIFIERS),
            Keyword::new("virtual machine"),
            Keyword::new("vm"),
            Keyword::new("web server"),
            Keyword::new("bastion"),
        ],
        resource_types: &["aws_instance", "aws_launch_template", "aws_autoscaling_group"],
        companions: &["aws_security_group"],
    },
    AwsService {
        name: "RDS",
        noun: "database",
        keywords: &[
            Keyword::new("rds"),
            Keyword::new("database"),
            Keyword::new("db"),
            Keyword::new("postgres"),
            Keyword::new("postgresql"),
            Keyword::new("mysql"),
            Keyword::new("mariadb"),
            Keyword::new("aurora"),
        ],
        resource_types: &["aws_db_instance", "aws_rds_cluster"],
        companions: &["aws_db_subnet_group", "aws_security_group"],
    },
    AwsService {
        name: "S3",
        noun: "bucket",
        keywords: &[Keyword::new("s3"), Keyword::new("bucket"), Keyword::new("object storage")],
        resource_types: &["aws_s3_bucket"],
        companions: &[],
    },
    AwsService {
        name: "Lambda",
        noun: "function",
        keywords: &[
            Keyword::new("lambda"),
            Keyword::new("serverless function"),
            Keyword::new("serverless"),
        ],
        resource_types: &["aws_lambda_function"],
        companions: &["aws_iam_role"],
    },
    AwsService {
        name: "IAM",
        noun: "role",
        keywords: &[Keyword::new("iam"), Keyword::new("role"), Keyword::new("permission")],
        resource_types: &["aws_iam_role", "aws_iam_user", "aws_iam_group", "aws_iam_policy"],
        companions: &[],
    },
    AwsService {
        name: "DynamoDB",
        noun: "table",
        keywords: &[Keyword::new("dynamodb"), Keyword::new("dynamo")],
        resource_types: &["aws_dynamodb_table"],
        companions: &[],
    },
    AwsService {
        name: "ELB",
        noun: "load balancer",
        keywords: &[
            Keyword::new("load balancer"),
            Keyword::new("alb"),
            Keyword::new("nlb"),
            Keyword::new("elb"),
        ],
        resource_types: &["aws_lb", "aws_alb"],
        companions: &["aws_lb_target_group", "aws_lb_listener"],
    },
    AwsService {
        name: "SQS",
        noun: "queue",
        keywords: &[Keyword::new("sqs"), Keyword::new("queue")],
        resource_types: &["aws_sqs_queue"],
        companions: &[],
    },
    AwsService {
        name: "SNS",
        noun: "topic",
        keywords: &[Keyword::new("sns"), Keyword::new("topic"), Keyword::new("notification")],
        resource_types: &["aws_sns_topic"],
        companions: &[],
    },
    AwsService {
        name: "ECS",
        noun: "container service",
        keywords: &[Keyword::new("ecs"), Keyword::new("fargate"), Keyword::new("container")],
        resource_types: &["aws_ecs_cluster", "aws_ecs_service"],
        companions: &["aws_ecs_task_definition"],
    },
    AwsService {
        name: "EKS",
        noun: "cluster",
        keywords: &[Keyword::new("eks"), Keyword::new("kubernetes"), Keyword::new("k8s")],
        resource_types: &["aws_eks_cluster"],
        companions: &["aws_iam_role"],
    },
    AwsService {
        name: "ElastiCache",
        noun: "cache",
        keywords: &[
            Keyword::new("elasticache"),
            Keyword::new("redis"),
            Keyword::new("memcached"),
            Keyword::new("cache"),
        ],
        resource_types: &["aws_elasticache_cluster", "aws_elasticache_replication_group"],
        companions: &["aws_elasticache_subnet_group"],
    },
    AwsService {
        name: "Route 53",
        noun: "DNS zone",
        keywords: &[Keyword::new("route53"), Keyword::new("route 53"), Keyword::new("dns")],
        resource_types: &["aws_route53_zone", "aws_route53_record"],
        companions: &[],
    },
    AwsService {
        name: "CloudFront",
        noun: "distribution",
        keywords: &[Keyword::new("cloudfront"), Keyword::new("cdn")],
        resource_types: &["aws_cloudfront_distribution"],
        companions: &[],
    },
    AwsService {
        name: "CloudWatch",
        noun: "alarm",
        keywords: &[
            Keyword::new("cloudwatch"),
            Keyword::new("alarm"),
            Keyword::new("log group"),
        ],
        resource_types: &["aws_cloudwatch_metric_alarm", "aws_cloudwatch_log_group"],
        companions: &[],
    },
    AwsService {
        name: "API Gateway",
        noun: "API",
        keywords: &[Keyword::new("api gateway"), Keyword::new("apigateway")],
        resource_types: &["aws_api_gateway_rest_api", "aws_apigatewayv2_api"],
        companions: &[],
    },
    AwsService {
        name: "Security Group",
        noun: "firewall",
        keywords: &[Keyword::new("security group"), Keyword::new("firewall")],
        resource_types: &["aws_security_group"],
        companions: &[],
    },
];

/// Services mentioned in `request`, ordered by where they are first mentioned.
pub fn identify_services(request: &str) -> Vec<&'static AwsService> {
    let lowered = request.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut found: Vec<(usize, &'static AwsService)> = CATALOG
        .iter()
        .filter_map(|service| {
            service
                .keywords
                .iter()
                .filter_map(|kw| first_match(&tokens, kw))
                .min()
                .map(|pos| (pos, service))
        })
        .collect();

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, service)| service).collect()
}

/// Token position of the first occurrence of `keyword`, honoring plurals.
fn first_match(tokens: &[&str], keyword: &Keyword) -> Option<usize> {
    let words: Vec<&str> = keyword.phrase.split(' ').collect();
    if words.is_empty() || tokens.len() < words.len() {
        return None;
    }

    (0..=tokens.len() - words.len()).find(|&start| {
        let matches = words
            .iter()
            .zip(&tokens[start..])
            .all(|(word, token)| token_matches(token, word));
        let excluded = start > 0 && keyword.unless_after.contains(&tokens[start - 1]);
        matches && !excluded
    })
}

fn token_matches(token: &str, word: &str) -> bool {
    token == word
        || token.strip_suffix('s') == Some(word)
        || token.strip_suffix("es") == Some(word)
}
