//! Typed topic channels between the headset pipeline and the operator.
//!
//! The operator only sees the [`Subscriber`] and [`Publisher`] traits. The
//! in-process implementation here is a bounded crossbeam channel per topic
//! with latest-value semantics: publishers never block and evict the oldest
//! queued sample when full, and every read returns the newest sample,
//! discarding anything older.

use crate::{Result, TeleopError};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

/// Non-blocking reads attempted per tick before a hand frame counts as missing.
pub const HAND_FRAME_ATTEMPTS: usize = 10;

/// Default queue depth for [`topic`].
pub const DEFAULT_CAPACITY: usize = 64;

pub trait Subscriber<T>: Send {
    /// Block until a sample is available.
    fn recv(&self) -> Result<T>;

    /// Return a sample if one is queued. `Ok(None)` means nothing yet.
    fn try_recv(&self) -> Result<Option<T>>;
}

pub trait Publisher<T>: Send {
    /// Best-effort publish; never blocks.
    fn publish(&self, value: T);
}

/// Try up to `attempts` non-blocking reads, returning the first sample.
pub fn poll_bounded<T>(subscriber: &dyn Subscriber<T>, attempts: usize) -> Result<Option<T>> {
    for _ in 0..attempts {
        if let Some(value) = subscriber.try_recv()? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Create a connected publisher/subscriber pair for one topic.
pub fn topic<T>(name: &str, capacity: usize) -> (TopicPublisher<T>, TopicSubscriber<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
    (
        TopicPublisher {
            name: name.to_string(),
            sender,
            evict: receiver.clone(),
        },
        TopicSubscriber {
            name: name.to_string(),
            receiver,
        },
    )
}

pub struct TopicPublisher<T> {
    name: String,
    sender: Sender<T>,
    /// Publisher-side handle used to drop the oldest sample when full.
    evict: Receiver<T>,
}

impl<T> TopicPublisher<T> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for TopicPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
            evict: self.evict.clone(),
        }
    }
}

impl<T: Send> Publisher<T> for TopicPublisher<T> {
    fn publish(&self, value: T) {
        match self.sender.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(value)) => {
                log::trace!("{} channel full, dropping oldest sample", self.name);
                let _ = self.evict.try_recv();
                if self.sender.try_send(value).is_err() {
                    log::trace!("{} channel refilled, dropping sample", self.name);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                log::trace!("{} has no subscriber, dropping sample", self.name);
            }
        }
    }
}

pub struct TopicSubscriber<T> {
    name: String,
    receiver: Receiver<T>,
}

impl<T> TopicSubscriber<T> {
    /// Skip past everything queued after `value`.
    fn latest(&self, mut value: T) -> T {
        while let Ok(next) = self.receiver.try_recv() {
            value = next;
        }
        value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of samples waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send> Subscriber<T> for TopicSubscriber<T> {
    fn recv(&self) -> Result<T> {
        let value = self
            .receiver
            .recv()
            .map_err(|_| TeleopError::ChannelDisconnected(self.name.clone()))?;
        Ok(self.latest(value))
    }

    fn try_recv(&self) -> Result<Option<T>> {
        match self.receiver.try_recv() {
            Ok(value) => Ok(Some(self.latest(value))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(TeleopError::ChannelDisconnected(self.name.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Yields a value only on the n-th read.
    struct LateSubscriber {
        reads: AtomicUsize,
        ready_on: usize,
    }

    impl Subscriber<u32> for LateSubscriber {
        fn recv(&self) -> Result<u32> {
            Ok(7)
        }

        fn try_recv(&self) -> Result<Option<u32>> {
            let n = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
            Ok((n == self.ready_on).then_some(7))
        }
    }

    #[test]
    fn test_poll_bounded_finds_late_sample() {
        let sub = LateSubscriber { reads: AtomicUsize::new(0), ready_on: HAND_FRAME_ATTEMPTS };
        assert_eq!(poll_bounded(&sub, HAND_FRAME_ATTEMPTS).unwrap(), Some(7));
    }

    #[test]
    fn test_poll_bounded_gives_up() {
        let sub = LateSubscriber { reads: AtomicUsize::new(0), ready_on: HAND_FRAME_ATTEMPTS + 1 };
        assert_eq!(poll_bounded(&sub, HAND_FRAME_ATTEMPTS).unwrap(), None);
        assert_eq!(sub.reads.load(Ordering::Relaxed), HAND_FRAME_ATTEMPTS);
    }

    #[test]
    fn test_read_returns_newest_sample() {
        let (tx, rx) = topic::<u32>("button", 4);
        tx.publish(1);
        tx.publish(0);
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.recv().unwrap(), 0);
        assert!(rx.is_empty());
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn test_full_topic_keeps_latest() {
        let (tx, rx) = topic::<u32>("transformed_hand_frame", DEFAULT_CAPACITY);
        for i in 0..100 {
            tx.publish(i);
        }
        assert_eq!(rx.len(), DEFAULT_CAPACITY);
        assert_eq!(poll_bounded(&rx, HAND_FRAME_ATTEMPTS).unwrap(), Some(99));
        assert_eq!(rx.try_recv().unwrap(), None);

        let (tx, rx) = topic::<u32>("joint", 1);
        tx.publish(1);
        tx.publish(2);
        assert_eq!(rx.recv().unwrap(), 2);
    }

    #[test]
    fn test_disconnect_is_reported() {
        let (tx, rx) = topic::<u32>("transformed_hand_frame", 4);
        drop(tx);
        assert!(matches!(rx.try_recv(), Err(TeleopError::ChannelDisconnected(_))));
        assert!(matches!(rx.recv(), Err(TeleopError::ChannelDisconnected(_))));
        assert!(poll_bounded(&rx, HAND_FRAME_ATTEMPTS).is_err());
    }

    #[test]
    fn test_publish_without_subscriber_is_silent() {
        let (tx, rx) = topic::<u32>("cartesian", 4);
        drop(rx);
        tx.publish(3);
        assert_eq!(tx.name(), "cartesian");
    }
}
