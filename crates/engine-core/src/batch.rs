use model::{Coordinate, Event};

/// The bounded in-memory buffer the handler assembles before calling
/// `Sink::commit`. Its coordinate is overwritten with the handler's
/// current position every time an event is appended, so it always reflects
/// the coordinate of the *last* event it holds.
#[derive(Debug, Default)]
pub struct Batch {
    events: Vec<Event>,
    coord: Option<Coordinate>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn push(&mut self, event: Event, coord: Coordinate) {
        self.events.push(event);
        self.coord = Some(coord);
    }

    /// Drains the buffer, returning its events and the coordinate they
    /// carry. `None` coordinate with a non-empty event list cannot happen
    /// by construction — every `push` sets both together.
    pub fn drain(&mut self) -> (Vec<Event>, Option<Coordinate>) {
        (std::mem::take(&mut self.events), self.coord.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Op, PositionToken};
    use std::collections::BTreeMap;

    fn coord(offset: u64) -> Coordinate {
        Coordinate::new(PositionToken::new("gtid:1"), "binlog.000001", offset)
    }

    fn event() -> Event {
        Event::new(
            "db".into(),
            "t".into(),
            "1".into(),
            Op::Insert,
            chrono::Utc::now(),
            BTreeMap::new(),
            coord(1),
            None,
        )
    }

    #[test]
    fn coordinate_tracks_last_pushed_event() {
        let mut batch = Batch::new();
        batch.push(event(), coord(1));
        batch.push(event(), coord(2));

        let (events, drained_coord) = batch.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(drained_coord, Some(coord(2)));
        assert!(batch.is_empty());
    }
}
