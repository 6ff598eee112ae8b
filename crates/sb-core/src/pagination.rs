//! Paginated replies: open sessions keyed by message id, button navigation,
//! and deadline-based eviction.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{MessageId, UserId},
    interaction::InteractionContext,
    messaging::types::{ActionRow, Button, ButtonStyle, Component, Embed, Reply},
    Result,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const FOREIGN_PRESS: &str = "These controls belong to someone else.";

/// The four navigation controls under a paginated reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavButton {
    First,
    Prev,
    Next,
    Last,
}

impl NavButton {
    pub const ALL: [NavButton; 4] = [
        NavButton::First,
        NavButton::Prev,
        NavButton::Next,
        NavButton::Last,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            NavButton::First => "first",
            NavButton::Prev => "prev",
            NavButton::Next => "next",
            NavButton::Last => "last",
        }
    }

    fn label(self) -> &'static str {
        match self {
            NavButton::First => "<<",
            NavButton::Prev => "<",
            NavButton::Next => ">",
            NavButton::Last => ">>",
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.custom_id() == custom_id)
    }

    /// Index after pressing `self` on page `index` of `len`. `prev` and
    /// `next` wrap around.
    pub fn step(self, index: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        match self {
            NavButton::First => 0,
            NavButton::Prev if index == 0 => len - 1,
            NavButton::Prev => index - 1,
            NavButton::Next => (index + 1) % len,
            NavButton::Last => len - 1,
        }
    }
}

/// Controls for page `index` of `len`: the leading pair is disabled on the
/// first page and the trailing pair on the last.
pub fn nav_row(index: usize, len: usize) -> ActionRow {
    let last = len.saturating_sub(1);
    ActionRow {
        components: NavButton::ALL
            .into_iter()
            .map(|b| {
                let disabled = match b {
                    NavButton::First | NavButton::Prev => index == 0,
                    NavButton::Next | NavButton::Last => index >= last,
                };
                Component::Button(Button {
                    custom_id: b.custom_id().to_string(),
                    label: b.label().to_string(),
                    style: ButtonStyle::Secondary,
                    disabled,
                })
            })
            .collect(),
    }
}

/// Page `index` with its controls.
pub fn page_reply(pages: &[Embed], index: usize) -> Reply {
    let mut reply = pages.get(index).cloned().map(Reply::embed).unwrap_or_default();
    reply.components = vec![nav_row(index, pages.len())];
    reply
}

struct Session {
    owner: UserId,
    pages: Vec<Embed>,
    index: usize,
    expires_at: Instant,
}

#[derive(Default)]
struct State {
    sessions: HashMap<MessageId, Session>,
    deadlines: BinaryHeap<Reverse<(Instant, MessageId)>>,
}

/// What a control press did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// The page was re-rendered at this index.
    Moved(usize),
    /// Someone other than the owner pressed; they were told so.
    Denied,
    /// No live session for that message.
    Ignored,
}

enum Step {
    Render(usize, Reply),
    Denied,
    Ignored,
}

/// Owns every open pagination session.
///
/// The lock is only held for map/heap edits, never across a send.
pub struct PaginationManager {
    ttl: Duration,
    state: Mutex<State>,
}

impl Default for PaginationManager {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl PaginationManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(State::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `pages` shown on `message`, owned by `owner`, starting at page 0.
    pub fn open(&self, message: MessageId, owner: UserId, pages: Vec<Embed>) {
        let expires_at = Instant::now() + self.ttl;
        let mut st = self.lock();
        st.sessions.insert(
            message,
            Session {
                owner,
                pages,
                index: 0,
                expires_at,
            },
        );
        st.deadlines.push(Reverse((expires_at, message)));
        tracing::debug!(%message, %owner, "pagination session opened");
    }

    /// Handle a button or select press on a paginated message.
    pub async fn handle(&self, ctx: &InteractionContext) -> Result<PressOutcome> {
        let Some(message) = ctx.interaction().message_id() else {
            return Ok(PressOutcome::Ignored);
        };
        let pressed = ctx.interaction().custom_id().and_then(NavButton::parse);

        let step = {
            let now = Instant::now();
            let mut st = self.lock();
            match st.sessions.get_mut(&message) {
                Some(s) if s.expires_at > now => {
                    if s.owner != ctx.user_id() {
                        Step::Denied
                    } else {
                        if let Some(b) = pressed {
                            s.index = b.step(s.index, s.pages.len());
                        }
                        Step::Render(s.index, page_reply(&s.pages, s.index))
                    }
                }
                _ => Step::Ignored,
            }
        };

        match step {
            Step::Render(index, reply) => {
                ctx.update(&reply).await?;
                Ok(PressOutcome::Moved(index))
            }
            Step::Denied => {
                ctx.reply(&Reply::text(FOREIGN_PRESS).ephemeral(true))
                    .await?;
                Ok(PressOutcome::Denied)
            }
            Step::Ignored => {
                tracing::debug!(%message, "press on unknown or expired session");
                Ok(PressOutcome::Ignored)
            }
        }
    }

    /// Remove every session whose deadline is at or before `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut st = self.lock();
        let mut removed = 0;
        while let Some(Reverse((deadline, message))) = st.deadlines.peek().copied() {
            if deadline > now {
                break;
            }
            st.deadlines.pop();
            // A reopened message carries a newer deadline; leave it.
            if st.sessions.get(&message).is_some_and(|s| s.expires_at == deadline) {
                st.sessions.remove(&message);
                removed += 1;
            }
        }
        removed
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, message: MessageId) -> bool {
        self.lock().sessions.contains_key(&message)
    }

    /// Current page of a live session.
    pub fn index_of(&self, message: MessageId) -> Option<usize> {
        self.lock().sessions.get(&message).map(|s| s.index)
    }

    /// Sweep every `every` until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let n = manager.sweep();
                        if n > 0 {
                            tracing::debug!(evicted = n, "pagination sessions expired");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{button, RecordingResponder, Sent};

    fn pages(n: usize) -> Vec<Embed> {
        (0..n).map(|i| Embed::new(format!("page {i}"))).collect()
    }

    #[test]
    fn navigation_from_first_page() {
        assert_eq!(NavButton::Prev.step(0, 5), 4);
        assert_eq!(NavButton::Last.step(0, 5), 4);
        assert_eq!(NavButton::First.step(3, 5), 0);
        let mut i = 0;
        for _ in 0..5 {
            i = NavButton::Next.step(i, 5);
        }
        assert_eq!(i, 0);
    }

    #[test]
    fn parses_known_control_ids_only() {
        assert_eq!(NavButton::parse("next"), Some(NavButton::Next));
        assert_eq!(NavButton::parse("jump"), None);
    }

    #[test]
    fn controls_disable_at_the_edges() {
        let disabled = |row: ActionRow| -> Vec<bool> {
            row.components
                .into_iter()
                .map(|c| match c {
                    Component::Button(b) => b.disabled,
                    Component::SelectMenu(_) => false,
                })
                .collect()
        };
        assert_eq!(disabled(nav_row(0, 5)), vec![true, true, false, false]);
        assert_eq!(disabled(nav_row(2, 5)), vec![false, false, false, false]);
        assert_eq!(disabled(nav_row(4, 5)), vec![false, false, true, true]);
    }

    async fn press(
        mgr: &PaginationManager,
        responder: &Arc<RecordingResponder>,
        user: u64,
        id: &str,
    ) -> PressOutcome {
        let ctx = InteractionContext::new(button(user, 42, id), responder.clone());
        mgr.handle(&ctx).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn presses_move_the_page_and_update_in_place() {
        let mgr = PaginationManager::default();
        let responder = RecordingResponder::new();
        mgr.open(MessageId(42), UserId(1), pages(5));

        assert_eq!(press(&mgr, &responder, 1, "prev").await, PressOutcome::Moved(4));
        assert_eq!(press(&mgr, &responder, 1, "first").await, PressOutcome::Moved(0));
        for _ in 0..4 {
            press(&mgr, &responder, 1, "next").await;
        }
        assert_eq!(press(&mgr, &responder, 1, "next").await, PressOutcome::Moved(0));
        assert_eq!(press(&mgr, &responder, 1, "last").await, PressOutcome::Moved(4));
        assert_eq!(press(&mgr, &responder, 1, "bogus").await, PressOutcome::Moved(4));

        let sent = responder.sent();
        assert_eq!(sent.len(), 9);
        assert_eq!(
            sent.last(),
            Some(&Sent::Update(page_reply(&pages(5), 4)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn other_users_cannot_navigate() {
        let mgr = PaginationManager::default();
        let responder = RecordingResponder::new();
        mgr.open(MessageId(42), UserId(1), pages(3));

        assert_eq!(press(&mgr, &responder, 2, "next").await, PressOutcome::Denied);
        assert_eq!(mgr.index_of(MessageId(42)), Some(0));
        assert_eq!(
            responder.sent(),
            vec![Sent::Reply(Reply::text(FOREIGN_PRESS).ephemeral(true))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_expire_after_ttl() {
        let mgr = PaginationManager::default();
        let responder = RecordingResponder::new();
        mgr.open(MessageId(42), UserId(1), pages(3));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(mgr.sweep(), 0);
        assert!(mgr.contains(MessageId(42)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(mgr.sweep(), 1);
        assert!(mgr.is_empty());

        assert_eq!(press(&mgr, &responder, 1, "next").await, PressOutcome::Ignored);
        assert!(responder.sent().is_empty());

        // Already gone: sweeping again is a no-op.
        assert_eq!(mgr.sweep(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_but_unswept_sessions_are_ignored() {
        let mgr = PaginationManager::default();
        let responder = RecordingResponder::new();
        mgr.open(MessageId(42), UserId(1), pages(3));

        tokio::time::advance(DEFAULT_TTL).await;
        assert_eq!(press(&mgr, &responder, 1, "next").await, PressOutcome::Ignored);
        assert!(responder.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reopened_message_keeps_its_newer_deadline() {
        let mgr = PaginationManager::default();
        mgr.open(MessageId(42), UserId(1), pages(2));
        tokio::time::advance(Duration::from_secs(200)).await;
        mgr.open(MessageId(42), UserId(1), pages(2));

        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(mgr.sweep(), 0);
        assert!(mgr.contains(MessageId(42)));

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(mgr.sweep(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweeper_evicts_and_stops_on_cancel() {
        let mgr = Arc::new(PaginationManager::new(Duration::from_secs(10)));
        mgr.open(MessageId(42), UserId(1), pages(2));

        let cancel = CancellationToken::new();
        let handle = mgr.spawn_sweeper(Duration::from_secs(1), cancel.clone());

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(mgr.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}
