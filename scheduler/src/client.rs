//! Control client: the requesting side of the command channel
//!
//! Used by the `status` and `stop` subcommands to talk to a running daemon
//! head that shares the same channel key.

use std::time::{Duration, Instant};

use shared::{ControlAction, ControlMessage, ProcessRecord, ProcessRole, process_debug};

use crate::error::{SchedulerError, SchedulerResult};
use crate::traits::CommandQueue;

/// How often the client polls for a reply
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Ask the daemon head for a status report and wait up to `timeout` for it
pub fn request_status<Q: CommandQueue>(queue: &Q, timeout: Duration) -> SchedulerResult<Vec<ProcessRecord>> {
    request_status_polling(queue, timeout, POLL_INTERVAL)
}

pub fn request_status_polling<Q: CommandQueue>(
    queue: &Q,
    timeout: Duration,
    poll: Duration,
) -> SchedulerResult<Vec<ProcessRecord>> {
    queue.send(ControlMessage::status());
    process_debug!(ProcessRole::current(), "Status request sent, waiting up to {:?}", timeout);

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(reply) = queue.receive(ControlAction::StatusReply) {
            return Ok(reply.start_list().map(<[ProcessRecord]>::to_vec).unwrap_or_default());
        }
        if Instant::now() >= deadline {
            // Take our request back so a late daemon does not answer nobody
            let _ = queue.receive(ControlAction::Status);
            return Err(SchedulerError::ReplyTimeout {
                action: ControlAction::StatusReply.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(poll);
    }
}

/// Ask the daemon head to signal its process group. Fire-and-forget.
pub fn request_stop<Q: CommandQueue>(queue: &Q, force: bool) {
    process_debug!(ProcessRole::current(), "Sending stop request (force: {})", force);
    queue.send(ControlMessage::stop(force));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockCommandQueue;
    use mockall::predicate::eq;
    use shared::{ControlPayload, Interval, TaskName};

    #[test]
    fn test_request_status_returns_reply_records() {
        let record = ProcessRecord::new(11, 10, TaskName::new("app", "mail"), Interval::from_secs(5).unwrap());
        let reply = ControlMessage::status_reply(vec![record.clone()]);

        let mut queue = MockCommandQueue::new();
        queue
            .expect_send()
            .withf(|m| m.action() == ControlAction::Status)
            .times(1)
            .return_const(());
        queue
            .expect_receive()
            .with(eq(ControlAction::StatusReply))
            .times(1)
            .return_once(move |_| Some(reply));

        let records = request_status_polling(&queue, Duration::from_secs(1), Duration::from_millis(1)).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_request_status_times_out_and_withdraws_request() {
        let mut queue = MockCommandQueue::new();
        queue.expect_send().times(1).return_const(());
        queue
            .expect_receive()
            .with(eq(ControlAction::StatusReply))
            .returning(|_| None);
        queue
            .expect_receive()
            .with(eq(ControlAction::Status))
            .times(1)
            .returning(|_| Some(ControlMessage::status()));

        let err = request_status_polling(&queue, Duration::ZERO, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, SchedulerError::ReplyTimeout { .. }));
    }

    #[test]
    fn test_request_stop_carries_force_flag() {
        let mut queue = MockCommandQueue::new();
        queue
            .expect_send()
            .withf(|m| m.payload == ControlPayload::Stop { force: true })
            .times(1)
            .return_const(());

        request_stop(&queue, true);
    }
}
