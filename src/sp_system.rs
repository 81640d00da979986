//! Cooperative discrete-event engine.
//!
//! One virtual clock, one task per node. A task is either sleeping out its
//! start-up delay or parked on its mailbox; handling a message runs to
//! completion, so every handler call is one scheduler step. Sent messages go
//! through a delivery queue and land in the receiver's mailbox `link_delay`
//! ticks later.
//!
//! Ordering rules, all deterministic:
//! - deliveries due at time `t` are applied before any task runs at `t`
//! - same-time deliveries keep their send order (sequence number)
//! - among runnable tasks the smallest (wake time, node id) goes first

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use log::{debug, trace, warn};

use crate::sp_accounting::MessageStats;
use crate::sp_config::EngineConfig;
use crate::sp_error::SimError;
use crate::sp_interface::{Envelope, Message, NodeId, SimTime};
use crate::sp_mailbox::Mailbox;
use crate::sp_node::{NodeContext, NodeCore, NodeProtocol};
use crate::sp_report::{NodeReport, SimulationReport};
use crate::sp_topology::Topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Start-up delay, neighbors not merged yet
    Sleeping { until: SimTime },
    /// Parked on the mailbox
    Waiting,
}

struct NodeTask<P> {
    core: NodeCore,
    protocol: P,
    mailbox: Mailbox,
    state: TaskState,
}

impl<P> NodeTask<P> {
    /// When the task could next run, None while parked on an empty mailbox
    fn wake_time(&self) -> Option<SimTime> {
        match self.state {
            TaskState::Sleeping { until } => Some(until),
            TaskState::Waiting => self.mailbox.ready_since(),
        }
    }
}

/// A sent message waiting for its delivery time
#[derive(Debug)]
struct ScheduledDelivery {
    time: SimTime,
    seq: u64,
    envelope: Envelope,
}

// BinaryHeap is a max-heap: reverse so the earliest (time, seq) pops first
impl PartialEq for ScheduledDelivery {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledDelivery {}

impl PartialOrd for ScheduledDelivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledDelivery {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Result of one `run_until` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub start_time: SimTime,
    pub end_time: SimTime,
    /// Task steps (initializations and handled messages)
    pub steps: u64,
    /// Messages moved from the delivery queue into mailboxes
    pub deliveries: u64,
    /// Nothing runnable and nothing in flight when the run stopped
    pub quiescent: bool,
    /// The run stopped at `max_steps_per_run` rather than at the limit
    pub step_capped: bool,
    /// Nodes parked on an empty mailbox in the middle of a round
    pub parked: Vec<NodeId>,
}

impl RunOutcome {
    /// Quiescent with no node stuck mid-round
    pub fn settled(&self) -> bool {
        self.quiescent && self.parked.is_empty()
    }
}

enum NextAction {
    Deliver(SimTime),
    Step(SimTime, NodeId),
    Idle,
}

pub struct System<P: NodeProtocol> {
    config: EngineConfig,
    now: SimTime,
    tasks: BTreeMap<NodeId, NodeTask<P>>,
    deliveries: BinaryHeap<ScheduledDelivery>,
    next_seq: u64,
    stats: MessageStats,
    outbox: Vec<Envelope>,
}

impl<P: NodeProtocol> System<P> {
    /// One task per topology vertex, each with its neighbor table.
    /// Tasks start sleeping for `init_delay` ticks.
    ///
    /// `link_delay` must be positive: every status message of a Toueg round
    /// has to land before the pivot's table can follow it down the tree.
    pub fn new(topology: &Topology, config: EngineConfig) -> Result<Self, SimError> {
        if topology.is_empty() {
            return Err(SimError::EmptyTopology);
        }
        if config.link_delay == 0 {
            return Err(SimError::ZeroLinkDelay);
        }

        let mut tasks = BTreeMap::new();
        for id in topology.nodes() {
            let mut core = NodeCore::new(id);
            if let Some(neighbors) = topology.neighbors(id) {
                for (neighbor, weight) in neighbors {
                    core.add_neighbor(*neighbor, *weight);
                }
            }
            tasks.insert(
                id,
                NodeTask {
                    core,
                    protocol: P::new(id),
                    mailbox: Mailbox::new(),
                    state: TaskState::Sleeping {
                        until: config.init_delay,
                    },
                },
            );
        }

        debug!(
            "{} engine: {} nodes, {} links, init_delay {} link_delay {}",
            P::NAME,
            tasks.len(),
            topology.link_count(),
            config.init_delay,
            config.link_delay
        );

        Ok(Self {
            config,
            now: 0,
            tasks,
            deliveries: BinaryHeap::new(),
            next_seq: 0,
            stats: MessageStats::new(),
            outbox: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.tasks.keys().copied().collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeCore> {
        self.tasks.get(&id).map(|t| &t.core)
    }

    pub fn protocol(&self, id: NodeId) -> Option<&P> {
        self.tasks.get(&id).map(|t| &t.protocol)
    }

    pub fn task_state(&self, id: NodeId) -> Option<TaskState> {
        self.tasks.get(&id).map(|t| t.state)
    }

    pub fn mailbox_len(&self, id: NodeId) -> usize {
        self.tasks.get(&id).map_or(0, |t| t.mailbox.len())
    }

    /// Messages sent but not yet in a mailbox
    pub fn in_flight(&self) -> usize {
        self.deliveries.len()
    }

    pub fn stats(&self) -> &MessageStats {
        &self.stats
    }

    /// Put a message straight into a node's mailbox.
    ///
    /// Bypasses the delivery queue and message accounting; this is how the
    /// round driver starts a round.
    pub fn inject(&mut self, id: NodeId, message: Message) -> Result<(), SimError> {
        let task = self.tasks.get_mut(&id).ok_or(SimError::UnknownNode(id))?;
        trace!("{} inject {} -> {}", self.now, message.kind(), id);
        task.mailbox.put(message, self.now);
        Ok(())
    }

    /// Inject a copy into every node, ascending id
    pub fn inject_all(&mut self, message: Message) {
        let now = self.now;
        for task in self.tasks.values_mut() {
            task.mailbox.put(message.clone(), now);
        }
    }

    pub fn run_for(&mut self, duration: SimTime) -> RunOutcome {
        let limit = self.now.saturating_add(duration);
        self.run_until(limit)
    }

    /// Run every runnable step up to virtual time `limit`.
    ///
    /// Stops at quiescence, when the next action lies beyond `limit`, or at
    /// the step cap. The clock ends at `limit` (or later if it already was).
    pub fn run_until(&mut self, limit: SimTime) -> RunOutcome {
        let start_time = self.now;
        let mut steps = 0u64;
        let mut delivered = 0u64;
        let mut quiescent = false;
        let mut step_capped = false;

        loop {
            match self.next_action() {
                NextAction::Idle => {
                    quiescent = true;
                    break;
                }
                NextAction::Deliver(time) => {
                    if time > limit {
                        break;
                    }
                    self.now = self.now.max(time);
                    delivered += self.deliver_due();
                }
                NextAction::Step(wake, id) => {
                    let at = self.now.max(wake);
                    if at > limit {
                        break;
                    }
                    if self.config.max_steps_per_run.is_some_and(|cap| steps >= cap) {
                        step_capped = true;
                        break;
                    }
                    self.now = at;
                    self.step(id);
                    steps += 1;
                }
            }
        }

        if step_capped {
            warn!(
                "{} engine stopped at step cap {} (t={})",
                P::NAME,
                steps,
                self.now
            );
        }
        self.now = self.now.max(limit);

        let outcome = RunOutcome {
            start_time,
            end_time: self.now,
            steps,
            deliveries: delivered,
            quiescent,
            step_capped,
            parked: self.parked_nodes(),
        };
        debug!(
            "{} run {}..{}: {} steps, {} deliveries, quiescent {}, parked {}",
            P::NAME,
            outcome.start_time,
            outcome.end_time,
            outcome.steps,
            outcome.deliveries,
            outcome.quiescent,
            outcome.parked.len()
        );
        outcome
    }

    /// Nodes waiting on an empty mailbox while a round is open for them
    pub fn parked_nodes(&self) -> Vec<NodeId> {
        self.tasks
            .iter()
            .filter(|(_, t)| {
                t.state == TaskState::Waiting && t.mailbox.is_empty() && !t.protocol.is_idle()
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            protocol: P::NAME.to_string(),
            nodes: self
                .tasks
                .iter()
                .map(|(id, t)| (*id, NodeReport::from_core(&t.core)))
                .collect(),
            total_messages: self.stats.total_messages,
            total_bits: self.stats.total_bits,
            end_time: self.now,
        }
    }

    fn next_action(&self) -> NextAction {
        let next_task = self
            .tasks
            .iter()
            .filter_map(|(id, t)| t.wake_time().map(|wake| (wake, *id)))
            .min();
        let next_delivery = self.deliveries.peek().map(|d| d.time);

        match (next_delivery, next_task) {
            (None, None) => NextAction::Idle,
            (Some(time), None) => NextAction::Deliver(time),
            (None, Some((wake, id))) => NextAction::Step(wake, id),
            (Some(time), Some((wake, id))) => {
                if time <= self.now.max(wake) {
                    NextAction::Deliver(time)
                } else {
                    NextAction::Step(wake, id)
                }
            }
        }
    }

    /// Move every delivery due at or before `now` into its mailbox
    fn deliver_due(&mut self) -> u64 {
        let mut count = 0;
        while self.deliveries.peek().is_some_and(|d| d.time <= self.now) {
            let Some(delivery) = self.deliveries.pop() else {
                break;
            };
            let envelope = delivery.envelope;
            match self.tasks.get_mut(&envelope.receiver) {
                Some(task) => {
                    task.mailbox.put(envelope.message, self.now);
                    count += 1;
                }
                None => warn!(
                    "dropping {} from {} to unknown node {}",
                    envelope.message.kind(),
                    envelope.sender,
                    envelope.receiver
                ),
            }
        }
        count
    }

    fn step(&mut self, id: NodeId) {
        let now = self.now;
        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };

        match task.state {
            TaskState::Sleeping { .. } => {
                task.protocol.initialize(&mut task.core);
                task.state = TaskState::Waiting;
                trace!("{} init {} degree {}", now, id, task.core.degree());
            }
            TaskState::Waiting => {
                let Some(message) = task.mailbox.take(now) else {
                    return;
                };
                let mut ctx = NodeContext::new(&mut task.core, &mut self.stats, &mut self.outbox, now);
                task.protocol.handle_message(&mut ctx, message);
            }
        }

        self.schedule_outbox();
    }

    fn schedule_outbox(&mut self) {
        let delay = self.config.link_delay;
        for envelope in self.outbox.drain(..) {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.deliveries.push(ScheduledDelivery {
                time: envelope.time.saturating_add(delay),
                seq,
                envelope,
            });
        }
    }
}
