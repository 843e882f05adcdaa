//! Demo download feed.
//!
//! Simulates a streaming download of a word graph: a worker thread walks the
//! graph breadth-first from a seed word, "downloading" the related words of
//! each one, and sends what it finds over a channel. The UI thread drains the
//! channel once per frame into a [`StreamingGraph`] and the progress tracker.

use super::source::StreamingGraph;
use super::types::{GraphLink, GraphNode, StructuralChange};
use crate::events::{EventBus, GraphReady};
use crate::progress::ProgressTracker;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const SYLLABLES: &[&str] = &[
    "ka", "lo", "mi", "ra", "ven", "tor", "sil", "quo", "ne", "ba", "dri", "fen", "ul", "sa",
    "mor", "ti",
];

/// Parameters of the simulated download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub seed: String,
    /// Words deeper than this are not expanded
    pub max_depth: u32,
    /// Upper bound of related words per download
    pub fan_out: usize,
    /// Simulated latency of one download
    pub delay_ms: u64,
    /// Probability that downloading one word fails
    pub failure_rate: f32,
    /// Probability that a related word points back to an already known word
    pub cross_link_rate: f32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed: "graph".to_string(),
            max_depth: 2,
            fan_out: 6,
            delay_ms: 80,
            failure_rate: 0.05,
            cross_link_rate: 0.1,
        }
    }
}

/// What the download worker reports
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Node(GraphNode),
    Link(GraphLink),
    Progress { remaining: usize, word: String },
    /// Downloading the related words of this word failed
    Failed(String),
    Done,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to download words related to \"{0}\"")]
    Download(String),
    #[error("download stopped before completion")]
    Disconnected,
}

/// Receiving end of a running download
pub struct DemoFeed {
    inbox: Receiver<FeedMessage>,
    finished: bool,
}

impl DemoFeed {
    /// Start the download worker
    pub fn spawn(config: FeedConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        tracing::info!(seed = %config.seed, max_depth = config.max_depth, "starting download");
        thread::spawn(move || run_download(config, tx));
        Self::from_receiver(rx)
    }

    pub fn from_receiver(inbox: Receiver<FeedMessage>) -> Self {
        Self {
            inbox,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply everything received so far to the graph and the tracker.
    ///
    /// Graph changes received in one call are published as one batch. When the
    /// worker reports completion (or goes away) the graph is marked loaded and
    /// announced on `ready`. Returns the number of accepted graph changes.
    pub fn drain_into(
        &mut self,
        graph: &mut StreamingGraph,
        progress: &mut ProgressTracker,
        ready: &EventBus<GraphReady>,
    ) -> usize {
        if self.finished {
            return 0;
        }

        let mut batch = Vec::new();
        let mut complete = false;
        loop {
            match self.inbox.try_recv() {
                Ok(FeedMessage::Node(node)) => batch.push(StructuralChange::NodeAdded(node)),
                Ok(FeedMessage::Link(link)) => batch.push(StructuralChange::LinkAdded(link)),
                Ok(FeedMessage::Progress { remaining, word }) => {
                    progress.update_layout(remaining, &word);
                }
                Ok(FeedMessage::Failed(word)) => {
                    let err = FeedError::Download(word);
                    tracing::warn!("{err}");
                    progress.download_error(err.to_string());
                }
                Ok(FeedMessage::Done) => {
                    complete = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let err = FeedError::Disconnected;
                    tracing::warn!("{err}");
                    progress.download_error(err.to_string());
                    complete = true;
                    break;
                }
            }
        }

        let accepted = if batch.is_empty() {
            0
        } else {
            graph.apply(batch).len()
        };

        if complete {
            self.finished = true;
            graph.finish_loading(ready);
        }
        accepted
    }
}

fn run_download(config: FeedConfig, tx: Sender<FeedMessage>) {
    let mut rng = rand::thread_rng();
    let mut known: Vec<String> = vec![config.seed.clone()];
    let mut seen: HashSet<String> = known.iter().cloned().collect();
    let mut queue: VecDeque<(String, u32)> = VecDeque::from([(config.seed.clone(), 0)]);

    if tx.send(FeedMessage::Node(GraphNode::new(config.seed.clone(), 0))).is_err() {
        return;
    }

    while let Some((word, depth)) = queue.pop_front() {
        if depth >= config.max_depth {
            continue;
        }

        let progress = FeedMessage::Progress {
            remaining: queue.len(),
            word: word.clone(),
        };
        if tx.send(progress).is_err() {
            tracing::debug!("download abandoned");
            return;
        }
        if config.delay_ms > 0 {
            thread::sleep(Duration::from_millis(config.delay_ms));
        }

        if rng.gen::<f32>() < config.failure_rate {
            if tx.send(FeedMessage::Failed(word)).is_err() {
                return;
            }
            continue;
        }

        let count = rng.gen_range(1..=config.fan_out.max(1));
        let mut messages = Vec::with_capacity(count * 2);
        for _ in 0..count {
            if rng.gen::<f32>() < config.cross_link_rate {
                if let Some(other) = known.choose(&mut rng) {
                    if *other != word {
                        messages.push(FeedMessage::Link(GraphLink::new(word.clone(), other.clone())));
                    }
                }
                continue;
            }

            let related = related_word(&word, &mut rng);
            if seen.insert(related.clone()) {
                known.push(related.clone());
                messages.push(FeedMessage::Node(GraphNode::new(related.clone(), depth + 1)));
                queue.push_back((related.clone(), depth + 1));
            }
            messages.push(FeedMessage::Link(GraphLink::new(word.clone(), related)));
        }

        for message in messages {
            if tx.send(message).is_err() {
                return;
            }
        }
    }

    let _ = tx.send(FeedMessage::Done);
}

/// Make up a word "related" to `word`: its first syllable plus one or two random ones
fn related_word(word: &str, rng: &mut impl Rng) -> String {
    let stem: String = word.chars().take(2).collect();
    let mut out = stem;
    for _ in 0..rng.gen_range(1..=2) {
        if let Some(syllable) = SYLLABLES.choose(rng) {
            out.push_str(syllable);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphSource;
    use crate::progress::Phase;
    use std::time::Instant;

    #[test]
    fn test_drain_applies_changes_and_progress() {
        let (tx, rx) = mpsc::channel();
        let mut feed = DemoFeed::from_receiver(rx);
        let mut graph = StreamingGraph::new(1);
        let mut progress = ProgressTracker::new();
        let ready = EventBus::new();
        let ready_sub = ready.subscribe();
        let changes = graph.subscribe_changes();

        tx.send(FeedMessage::Node(GraphNode::new("root", 0))).unwrap();
        tx.send(FeedMessage::Progress { remaining: 2, word: "root".into() }).unwrap();
        tx.send(FeedMessage::Node(GraphNode::new("leaf", 1))).unwrap();
        tx.send(FeedMessage::Link(GraphLink::new("root", "leaf"))).unwrap();
        tx.send(FeedMessage::Failed("other".into())).unwrap();

        assert_eq!(feed.drain_into(&mut graph, &mut progress, &ready), 3);
        assert_eq!(changes.drain().len(), 1);
        assert_eq!(progress.state().download.remaining, 2);
        assert_eq!(progress.state().download.current_word, "root");
        assert_eq!(progress.state().download.errors.len(), 1);
        assert!(progress.state().download.errors[0].contains("other"));
        assert!(!feed.is_finished());
        assert!(ready_sub.drain().is_empty());

        tx.send(FeedMessage::Done).unwrap();
        feed.drain_into(&mut graph, &mut progress, &ready);
        assert!(feed.is_finished());
        assert!(graph.is_loaded());
        assert_eq!(ready_sub.drain(), vec![GraphReady(graph.id())]);
        assert_eq!(progress.state().phase, Phase::None);
    }

    #[test]
    fn test_disconnect_finishes_with_error() {
        let (tx, rx) = mpsc::channel();
        let mut feed = DemoFeed::from_receiver(rx);
        let mut graph = StreamingGraph::new(1);
        let mut progress = ProgressTracker::new();
        let ready = EventBus::new();

        tx.send(FeedMessage::Node(GraphNode::new("root", 0))).unwrap();
        drop(tx);

        feed.drain_into(&mut graph, &mut progress, &ready);
        assert!(feed.is_finished());
        assert!(graph.is_loaded());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(progress.state().download.errors.len(), 1);
    }

    #[test]
    fn test_worker_builds_graph_within_depth() {
        let config = FeedConfig {
            seed: "seed".into(),
            max_depth: 2,
            fan_out: 3,
            delay_ms: 0,
            failure_rate: 0.0,
            cross_link_rate: 0.0,
        };
        let mut feed = DemoFeed::spawn(config);
        let mut graph = StreamingGraph::new(2);
        let mut progress = ProgressTracker::new();
        let ready = EventBus::new();

        let started = Instant::now();
        while !feed.is_finished() && started.elapsed() < Duration::from_secs(10) {
            feed.drain_into(&mut graph, &mut progress, &ready);
            thread::sleep(Duration::from_millis(1));
        }

        assert!(graph.is_loaded());
        assert_eq!(graph.node("seed").map(|n| n.depth), Some(0));
        let mut deepest = 0;
        graph.for_each_node(&mut |node| deepest = deepest.max(node.depth));
        assert!(deepest <= 2);
        assert!(graph.node_count() >= 2);
        assert!(progress.state().download.errors.is_empty());
    }
}
