use crate::Destination;

/// Identifies a message within the feed it was published to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID:{}", self.0)
    }
}

/// Payload of a [`Message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    Empty,
    Bytes(bytes::Bytes),
    Text(String),
}

impl Body {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
        }
    }
}

/// A message handed out by a [`Consumer`]. Once received it belongs to the caller; the consumer
/// keeps no reference to it.
///
/// [`Consumer`]: crate::Consumer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    destination: Option<Destination>,
    body: Body,
    properties: std::collections::BTreeMap<String, String>,
    timestamp: std::time::SystemTime,
}

impl Message {
    pub fn new(body: Body) -> Self {
        Self {
            id: MessageId(0),
            destination: None,
            body,
            properties: Default::default(),
            timestamp: std::time::SystemTime::now(),
        }
    }

    pub fn bytes(body: impl Into<bytes::Bytes>) -> Self {
        Self::new(Body::Bytes(body.into()))
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(Body::Text(body.into()))
    }

    pub fn empty() -> Self {
        Self::new(Body::Empty)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Stamps the message with the identity and destination assigned by a feed on publish.
    pub fn stamp(mut self, id: MessageId, destination: Destination) -> Self {
        self.id = id;
        self.destination = Some(destination);
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The destination this message was published to, if it went through a feed.
    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn timestamp(&self) -> std::time::SystemTime {
        self.timestamp
    }

    /// Extracts the body as raw bytes. A message without a body yields an empty byte sequence.
    /// Text bodies cannot be read as bytes.
    pub fn to_bytes(&self) -> Result<bytes::Bytes, crate::BodyError> {
        match &self.body {
            Body::Empty => Ok(bytes::Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes.clone()),
            body => Err(crate::BodyError::NotBytes { found: body.kind() }),
        }
    }

    /// Consuming version of [`to_bytes`](Self::to_bytes).
    pub fn into_bytes(self) -> Result<bytes::Bytes, crate::BodyError> {
        match self.body {
            Body::Empty => Ok(bytes::Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            body => Err(crate::BodyError::NotBytes { found: body.kind() }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_body() {
        let message = Message::bytes(&b"hello"[..]);
        assert_eq!(message.to_bytes().unwrap(), bytes::Bytes::from_static(b"hello"));
        assert_eq!(message.into_bytes().unwrap(), bytes::Bytes::from_static(b"hello"));
    }

    #[test]
    fn empty_body_is_zero_length() {
        assert_eq!(Message::empty().to_bytes().unwrap(), bytes::Bytes::new());
    }

    #[test]
    fn text_body_is_not_bytes() {
        assert_matches::assert_matches!(
            Message::text("hello").into_bytes(),
            Err(crate::BodyError::NotBytes { found: "text" })
        );
    }

    #[test]
    fn properties() {
        let message = Message::empty().with_property("kind", "order").with_property("region", "eu");
        assert_eq!(message.property("kind"), Some("order"));
        assert_eq!(message.property("missing"), None);
        assert_eq!(message.properties().collect::<Vec<_>>(), vec![("kind", "order"), ("region", "eu")]);
    }
}
