//! Message bus plumbing shared by all consumers: the delivery/outcome
//! types handlers speak, topic-exchange pattern matching, and the AMQP
//! shell that ties a consumer to its queue.

pub mod broker;

use async_trait::async_trait;

/// A raw message taken off a queue.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub routing_key: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Delivery {
    #[must_use]
    pub fn new(routing_key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            content_type: None,
            body: body.into(),
        }
    }
}

/// What the broker should do with a delivery after it was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ack,
    Reject { requeue: bool },
}

/// A consumer bound to one named queue. Messages matching any of the
/// routing key patterns are delivered one at a time; the returned
/// [`Outcome`] is relayed to the broker.
#[async_trait]
pub trait Consumer: Send + Sync {
    fn queue_name(&self) -> &str;

    fn routing_keys(&self) -> Vec<String>;

    async fn handle(&self, delivery: &Delivery) -> Outcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*` - exactly one segment.
    Any,
    /// `#` - zero or more segments.
    Rest,
}

/// A topic-exchange binding pattern over dot-delimited routing keys,
/// with standard `*` and `#` wildcard semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl TopicPattern {
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('.')
            .map(|segment| match segment {
                "*" => Segment::Any,
                "#" => Segment::Rest,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segment-wise match of a routing key against this pattern.
    #[must_use]
    pub fn matches(&self, routing_key: &str) -> bool {
        let key: Vec<&str> = routing_key.split('.').collect();
        matches_from(&self.segments, &key)
    }
}

fn matches_from(pattern: &[Segment], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((Segment::Rest, rest)) => {
            (0..=key.len()).any(|skipped| matches_from(rest, &key[skipped..]))
        }
        Some((segment, rest)) => key.split_first().is_some_and(|(head, tail)| {
            let head_matches = match segment {
                Segment::Literal(literal) => literal == head,
                Segment::Any => true,
                Segment::Rest => unreachable!("handled above"),
            };
            head_matches && matches_from(rest, tail)
        }),
    }
}
