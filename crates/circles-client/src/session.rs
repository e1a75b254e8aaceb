//! A client's view of the shared canvas.

use circles_core::{compose_circle, Canvas, CanvasChange, Initials};
use circles_protocol::{CircleEvent, Event};
use circles_transport::{Connection, TransportError};
use rand::Rng;
use tracing::debug;

/// One user's session with a relay.
///
/// Outgoing events are only sent. The canvas changes when the relay
/// delivers them back, so every client renders the same sequence.
pub struct Session<C> {
    conn: C,
    initials: Initials,
    canvas: Canvas,
}

impl<C: Connection> Session<C> {
    /// Start a session on an open connection.
    pub fn new(conn: C, initials: Initials) -> Self {
        Self {
            conn,
            initials,
            canvas: Canvas::new(),
        }
    }

    /// The user's initials.
    pub fn initials(&self) -> &Initials {
        &self.initials
    }

    /// Everything rendered so far.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Send a circle for a click at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be sent.
    pub async fn click<R: Rng + ?Sized>(
        &mut self,
        x: i32,
        y: i32,
        rng: &mut R,
    ) -> Result<CircleEvent, TransportError> {
        let circle = compose_circle(&self.initials, x, y, rng);
        debug!(x, y, dia = %circle.diameter, color = %circle.color, "Sending circle");
        self.conn.send(&Event::add_circle(circle.clone())).await?;
        Ok(circle)
    }

    /// Ask every client to clear its canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be sent.
    pub async fn clear(&mut self) -> Result<(), TransportError> {
        self.conn.send(&Event::clear()).await
    }

    /// Wait for the next relayed event and render it.
    ///
    /// Returns `None` once the relay closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if receiving fails.
    pub async fn next_change(&mut self) -> Result<Option<CanvasChange>, TransportError> {
        match self.conn.recv().await? {
            Some(event) => Ok(Some(self.canvas.apply(&event))),
            None => Ok(None),
        }
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.conn.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use circles_core::palette::{MAX_DIAMETER, MIN_DIAMETER};
    use circles_protocol::Encoding;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;

    /// Delivers every sent event back, like a relay with one client.
    #[derive(Default)]
    struct Loopback {
        inbox: VecDeque<Event>,
        sent: Vec<Event>,
        closed: bool,
    }

    #[async_trait]
    impl Connection for Loopback {
        async fn recv(&mut self) -> Result<Option<Event>, TransportError> {
            Ok(self.inbox.pop_front())
        }

        async fn send(&mut self, event: &Event) -> Result<(), TransportError> {
            if self.closed {
                return Err(TransportError::ConnectionClosed);
            }
            self.sent.push(event.clone());
            self.inbox.push_back(event.clone());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.closed = true;
            Ok(())
        }

        fn encoding(&self) -> Encoding {
            Encoding::Json
        }

        fn is_open(&self) -> bool {
            !self.closed
        }
    }

    fn session() -> Session<Loopback> {
        Session::new(Loopback::default(), Initials::parse("ab").unwrap())
    }

    #[tokio::test]
    async fn test_click_renders_only_on_echo() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(3);

        let circle = session.click(50, 80, &mut rng).await.unwrap();
        assert_eq!(circle.initials, session.initials().as_str());
        let diameter = circle.diameter.as_i64().unwrap();
        assert!((i64::from(MIN_DIAMETER)..=i64::from(MAX_DIAMETER)).contains(&diameter));
        assert_eq!(session.connection().sent, vec![Event::add_circle(circle.clone())]);
        assert!(session.canvas().is_empty());

        match session.next_change().await.unwrap() {
            Some(CanvasChange::Added(element)) => {
                assert_eq!(element.center(), (50.0, 80.0));
                assert_eq!(element.size, circle.diameter_px());
                assert_eq!(element.label, "AB");
            }
            other => panic!("expected a circle, got {other:?}"),
        }
        assert_eq!(session.canvas().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_after_echo() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(4);

        session.click(1, 2, &mut rng).await.unwrap();
        session.click(3, 4, &mut rng).await.unwrap();
        session.clear().await.unwrap();

        session.next_change().await.unwrap();
        session.next_change().await.unwrap();
        assert_eq!(session.canvas().len(), 2);

        assert_eq!(
            session.next_change().await.unwrap(),
            Some(CanvasChange::Cleared(2))
        );
        assert!(session.canvas().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_events_render() {
        let mut session = session();
        session.conn.inbox.push_back(Event::add_circle(CircleEvent {
            initials: "XYZ".to_string(),
            x: 10.into(),
            y: 10.into(),
            diameter: 5.into(),
            color: "rgba(1,2,3,0.5)".to_string(),
        }));

        assert!(matches!(
            session.next_change().await.unwrap(),
            Some(CanvasChange::Added(_))
        ));
        assert_eq!(session.canvas().elements()[0].label, "XYZ");
        assert!(session.connection().sent.is_empty());
    }

    #[test]
    fn test_session_identity() {
        let session = session();
        assert_eq!(session.initials().as_str(), "AB");
        assert_eq!(session.connection().encoding(), Encoding::Json);
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let mut session = session();
        assert_eq!(session.next_change().await.unwrap(), None);

        session.close().await.unwrap();
        assert!(!session.connection().is_open());
        assert!(matches!(
            session.clear().await,
            Err(TransportError::ConnectionClosed)
        ));
    }
}
