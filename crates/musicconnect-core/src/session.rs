use std::path::Path;
use std::sync::Arc;

use musicconnect_memory::{FileKeyValueStore, ProposalStore};
use musicconnect_schema::{ActivityDetail, ActivitySummary, DetailField, TargetGroup};
use thiserror::Error;

use crate::config::MusicConnectConfig;
use crate::generation::{ActivityGenerator, GenerationError};

pub const IDEAS_ERROR_MESSAGE: &str = "เกิดข้อผิดพลาดในการสร้างไอเดีย กรุณาลองใหม่อีกครั้ง";
pub const LOAD_MORE_ERROR_MESSAGE: &str = "เกิดข้อผิดพลาดในการโหลดข้อมูลเพิ่มเติม";
pub const DETAIL_ERROR_MESSAGE: &str = "ไม่สามารถโหลดข้อมูลได้";
pub const CUSTOM_ERROR_MESSAGE: &str =
    "เกิดข้อผิดพลาดในการสร้างข้อเสนอโครงการ กรุณาลองใหม่อีกครั้ง";
pub const REFINE_ERROR_MESSAGE: &str = "ไม่สามารถปรับแก้ข้อเสนอโครงการได้ กรุณาลองใหม่อีกครั้ง";
pub const NOT_CONFIGURED_MESSAGE: &str =
    "ยังไม่ได้ตั้งค่า API key สำหรับการสร้างเนื้อหา กรุณาตั้งค่าก่อนใช้งาน";

/// Origin label attached to proposals generated from a free-form request.
pub const CUSTOM_ORIGIN_LABEL: &str = "กิจกรรมที่กำหนดเอง";

fn failure_message(base: &str, err: &GenerationError) -> String {
    match err {
        GenerationError::NotConfigured => NOT_CONFIGURED_MESSAGE.to_string(),
        _ => base.to_string(),
    }
}

/// An action refused before anything was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no audience selected yet")]
    NoActiveAudience,
    #[error("ideas are already loading")]
    IdeasBusy,
    #[error("no idea at position {0}")]
    IdeaOutOfRange(usize),
    #[error("custom request is empty")]
    EmptyCustomRequest,
    #[error("refine instruction is empty")]
    EmptyRefineInstruction,
    #[error("no proposal is displayed")]
    NoDetail,
    #[error("a refinement is already running")]
    RefineBusy,
    #[error("not in edit mode")]
    NotEditing,
    #[error("save or cancel the open edit first")]
    EditInProgress,
    #[error("no saved proposal with id {0}")]
    SavedNotFound(String),
}

/// What happened to a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// The result was an error and the slot now shows a message.
    Failed,
    /// A newer request for the same slot superseded this one.
    Stale,
    Rejected(ValidationError),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdeasPhase {
    #[default]
    Idle,
    /// A fresh batch is loading; the previous one has been cleared.
    Loading,
    /// More ideas are loading; the current batch stays visible.
    LoadingMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailStatus {
    Loading,
    Ready(ActivityDetail),
    Failed(String),
}

/// The open proposal, with its edit and refine state.
#[derive(Debug, Clone)]
pub struct DetailView {
    status: DetailStatus,
    origin_label: Option<String>,
    draft: Option<ActivityDetail>,
    refining: bool,
    refine_error: Option<String>,
}

impl DetailView {
    fn loading(origin_label: Option<String>) -> Self {
        Self {
            status: DetailStatus::Loading,
            origin_label,
            draft: None,
            refining: false,
            refine_error: None,
        }
    }

    fn ready(detail: ActivityDetail, origin_label: Option<String>) -> Self {
        Self {
            status: DetailStatus::Ready(detail),
            ..Self::loading(origin_label)
        }
    }

    pub fn status(&self) -> &DetailStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == DetailStatus::Loading
    }

    /// The last confirmed proposal.
    pub fn detail(&self) -> Option<&ActivityDetail> {
        match &self.status {
            DetailStatus::Ready(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            DetailStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The working copy while editing, otherwise the confirmed proposal.
    pub fn displayed(&self) -> Option<&ActivityDetail> {
        self.draft.as_ref().or_else(|| self.detail())
    }

    pub fn draft(&self) -> Option<&ActivityDetail> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn is_refining(&self) -> bool {
        self.refining
    }

    pub fn refine_error(&self) -> Option<&str> {
        self.refine_error.as_deref()
    }

    pub fn origin_label(&self) -> Option<&str> {
        self.origin_label.as_deref()
    }
}

#[derive(Debug, Default)]
struct RequestSeq {
    latest: u64,
}

impl RequestSeq {
    fn next(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    fn invalidate(&mut self) {
        self.latest += 1;
    }

    fn is_current(&self, id: u64) -> bool {
        self.latest == id
    }
}

/// Pending idea-list request (discover or load-more).
#[derive(Debug, Clone)]
pub struct IdeasTicket {
    id: u64,
    group: TargetGroup,
    existing_titles: Vec<String>,
    append: bool,
}

impl IdeasTicket {
    pub fn group(&self) -> TargetGroup {
        self.group
    }

    pub fn is_load_more(&self) -> bool {
        self.append
    }

    pub async fn run(
        &self,
        generator: &ActivityGenerator,
    ) -> Result<Vec<ActivitySummary>, GenerationError> {
        generator.ideas(self.group, &self.existing_titles).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailRequest {
    FromTitle { title: String, group: TargetGroup },
    Freeform { request: String },
}

/// Pending proposal request (view-detail or custom-generate).
#[derive(Debug, Clone)]
pub struct DetailTicket {
    id: u64,
    request: DetailRequest,
}

impl DetailTicket {
    pub fn request(&self) -> &DetailRequest {
        &self.request
    }

    pub async fn run(
        &self,
        generator: &ActivityGenerator,
    ) -> Result<ActivityDetail, GenerationError> {
        match &self.request {
            DetailRequest::FromTitle { title, group } => {
                generator.detail_from_title(title, *group).await
            }
            DetailRequest::Freeform { request } => generator.detail_from_freeform(request).await,
        }
    }
}

/// Pending refinement of the displayed proposal.
#[derive(Debug, Clone)]
pub struct RefineTicket {
    id: u64,
    current: ActivityDetail,
    instruction: String,
}

impl RefineTicket {
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub async fn run(
        &self,
        generator: &ActivityGenerator,
    ) -> Result<ActivityDetail, GenerationError> {
        generator.refine(&self.current, &self.instruction).await
    }
}

/// Drives the discover, detail, refine, edit and save workflows.
///
/// Every workflow slot keeps its own loading flag and error, and each
/// `begin_*` call stamps a ticket so that only the latest request of a slot
/// is applied when it finishes.
pub struct Session {
    generator: ActivityGenerator,
    store: ProposalStore,
    active_group: Option<TargetGroup>,
    ideas: Vec<ActivitySummary>,
    ideas_phase: IdeasPhase,
    ideas_error: Option<String>,
    custom_error: Option<String>,
    detail: Option<DetailView>,
    ideas_seq: RequestSeq,
    detail_seq: RequestSeq,
    refine_seq: RequestSeq,
}

impl Session {
    pub fn new(generator: ActivityGenerator, store: ProposalStore) -> Self {
        Self {
            generator,
            store,
            active_group: None,
            ideas: Vec::new(),
            ideas_phase: IdeasPhase::Idle,
            ideas_error: None,
            custom_error: None,
            detail: None,
            ideas_seq: RequestSeq::default(),
            detail_seq: RequestSeq::default(),
            refine_seq: RequestSeq::default(),
        }
    }

    /// Builds a session with a file-backed store under the configured data dir.
    pub fn open(config: &MusicConnectConfig, root: &Path) -> Self {
        let data_dir = config.storage.data_path(root);
        let backend = Arc::new(FileKeyValueStore::new(&data_dir));
        let store = ProposalStore::load_with_key(backend, config.storage.key.clone());
        tracing::info!(
            data_dir = %data_dir.display(),
            saved = store.len(),
            "session store loaded"
        );
        Self::new(ActivityGenerator::from_config(&config.provider), store)
    }

    pub fn generator(&self) -> &ActivityGenerator {
        &self.generator
    }

    pub fn store(&self) -> &ProposalStore {
        &self.store
    }

    pub fn active_group(&self) -> Option<TargetGroup> {
        self.active_group
    }

    pub fn ideas(&self) -> &[ActivitySummary] {
        &self.ideas
    }

    pub fn ideas_phase(&self) -> IdeasPhase {
        self.ideas_phase
    }

    pub fn ideas_error(&self) -> Option<&str> {
        self.ideas_error.as_deref()
    }

    pub fn custom_error(&self) -> Option<&str> {
        self.custom_error.as_deref()
    }

    pub fn detail_view(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    // ------------------------------------------------------------------
    // Ideas
    // ------------------------------------------------------------------

    pub fn begin_discover(&mut self, group: TargetGroup) -> IdeasTicket {
        self.active_group = Some(group);
        self.ideas.clear();
        self.ideas_error = None;
        self.ideas_phase = IdeasPhase::Loading;
        let id = self.ideas_seq.next();
        tracing::debug!(group = %group, request = id, "discover started");
        IdeasTicket {
            id,
            group,
            existing_titles: Vec::new(),
            append: false,
        }
    }

    pub fn begin_load_more(&mut self) -> Result<IdeasTicket, ValidationError> {
        let group = self.active_group.ok_or(ValidationError::NoActiveAudience)?;
        if self.ideas_phase != IdeasPhase::Idle {
            return Err(ValidationError::IdeasBusy);
        }
        self.ideas_error = None;
        self.ideas_phase = IdeasPhase::LoadingMore;
        let id = self.ideas_seq.next();
        tracing::debug!(group = %group, request = id, shown = self.ideas.len(), "load more started");
        Ok(IdeasTicket {
            id,
            group,
            existing_titles: self.ideas.iter().map(|idea| idea.title.clone()).collect(),
            append: true,
        })
    }

    pub fn finish_ideas(
        &mut self,
        ticket: IdeasTicket,
        result: Result<Vec<ActivitySummary>, GenerationError>,
    ) -> ActionOutcome {
        if !self.ideas_seq.is_current(ticket.id) {
            tracing::debug!(request = ticket.id, "discarding stale ideas response");
            return ActionOutcome::Stale;
        }
        self.ideas_phase = IdeasPhase::Idle;
        match result {
            Ok(batch) => {
                if ticket.append {
                    self.ideas.extend(batch);
                } else {
                    self.ideas = batch;
                }
                ActionOutcome::Applied
            }
            Err(err) => {
                let base = if ticket.append {
                    LOAD_MORE_ERROR_MESSAGE
                } else {
                    IDEAS_ERROR_MESSAGE
                };
                self.ideas_error = Some(failure_message(base, &err));
                ActionOutcome::Failed
            }
        }
    }

    pub async fn discover(&mut self, group: TargetGroup) -> ActionOutcome {
        let ticket = self.begin_discover(group);
        let result = ticket.run(&self.generator).await;
        self.finish_ideas(ticket, result)
    }

    pub async fn load_more(&mut self) -> ActionOutcome {
        let ticket = match self.begin_load_more() {
            Ok(ticket) => ticket,
            Err(err) => return ActionOutcome::Rejected(err),
        };
        let result = ticket.run(&self.generator).await;
        self.finish_ideas(ticket, result)
    }

    // ------------------------------------------------------------------
    // Detail
    // ------------------------------------------------------------------

    fn open_view(&mut self, view: DetailView) {
        self.refine_seq.invalidate();
        self.detail = Some(view);
    }

    /// Opens the idea at `index` of the current batch and requests its proposal.
    pub fn begin_view_detail(&mut self, index: usize) -> Result<DetailTicket, ValidationError> {
        let group = self.active_group.ok_or(ValidationError::NoActiveAudience)?;
        let title = self
            .ideas
            .get(index)
            .map(|idea| idea.title.clone())
            .ok_or(ValidationError::IdeaOutOfRange(index))?;

        self.open_view(DetailView::loading(Some(group.label().to_string())));
        let id = self.detail_seq.next();
        tracing::debug!(title = %title, request = id, "view detail started");
        Ok(DetailTicket {
            id,
            request: DetailRequest::FromTitle { title, group },
        })
    }

    pub fn begin_custom_generate(&mut self, text: &str) -> Result<DetailTicket, ValidationError> {
        let request = text.trim();
        if request.is_empty() {
            return Err(ValidationError::EmptyCustomRequest);
        }
        self.custom_error = None;
        self.open_view(DetailView::loading(Some(CUSTOM_ORIGIN_LABEL.to_string())));
        let id = self.detail_seq.next();
        tracing::debug!(request = id, "custom generate started");
        Ok(DetailTicket {
            id,
            request: DetailRequest::Freeform {
                request: request.to_string(),
            },
        })
    }

    /// Applies a proposal result.
    ///
    /// A failed title lookup leaves the view open in a failed state; a failed
    /// free-form request closes the view and reports on the custom slot instead.
    pub fn finish_detail(
        &mut self,
        ticket: DetailTicket,
        result: Result<ActivityDetail, GenerationError>,
    ) -> ActionOutcome {
        if !self.detail_seq.is_current(ticket.id) || self.detail.is_none() {
            tracing::debug!(request = ticket.id, "discarding stale detail response");
            return ActionOutcome::Stale;
        }
        match (result, ticket.request) {
            (Ok(detail), _) => {
                if let Some(view) = self.detail.as_mut() {
                    view.status = DetailStatus::Ready(detail);
                }
                ActionOutcome::Applied
            }
            (Err(err), DetailRequest::FromTitle { .. }) => {
                if let Some(view) = self.detail.as_mut() {
                    view.status = DetailStatus::Failed(failure_message(DETAIL_ERROR_MESSAGE, &err));
                }
                ActionOutcome::Failed
            }
            (Err(err), DetailRequest::Freeform { .. }) => {
                self.detail = None;
                self.custom_error = Some(failure_message(CUSTOM_ERROR_MESSAGE, &err));
                ActionOutcome::Failed
            }
        }
    }

    pub async fn view_detail(&mut self, index: usize) -> ActionOutcome {
        let ticket = match self.begin_view_detail(index) {
            Ok(ticket) => ticket,
            Err(err) => return ActionOutcome::Rejected(err),
        };
        let result = ticket.run(&self.generator).await;
        self.finish_detail(ticket, result)
    }

    pub async fn custom_generate(&mut self, text: &str) -> ActionOutcome {
        let ticket = match self.begin_custom_generate(text) {
            Ok(ticket) => ticket,
            Err(err) => return ActionOutcome::Rejected(err),
        };
        let result = ticket.run(&self.generator).await;
        self.finish_detail(ticket, result)
    }

    /// Displays a saved proposal.
    pub fn open_saved(&mut self, id: &str) -> Result<(), ValidationError> {
        let saved = self
            .store
            .get(id)
            .ok_or_else(|| ValidationError::SavedNotFound(id.to_string()))?;
        let view = DetailView::ready(saved.detail.clone(), saved.target_group_label.clone());
        self.detail_seq.invalidate();
        self.open_view(view);
        Ok(())
    }

    /// Closes the view; in-flight detail and refine responses become stale.
    pub fn close_detail(&mut self) {
        self.detail_seq.invalidate();
        self.refine_seq.invalidate();
        self.detail = None;
    }

    // ------------------------------------------------------------------
    // Refine
    // ------------------------------------------------------------------

    pub fn begin_refine(&mut self, instruction: &str) -> Result<RefineTicket, ValidationError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(ValidationError::EmptyRefineInstruction);
        }
        let view = self.detail.as_mut().ok_or(ValidationError::NoDetail)?;
        if view.refining {
            return Err(ValidationError::RefineBusy);
        }
        let current = view.displayed().cloned().ok_or(ValidationError::NoDetail)?;
        view.refining = true;
        view.refine_error = None;
        let id = self.refine_seq.next();
        tracing::debug!(title = %current.title, request = id, "refine started");
        Ok(RefineTicket {
            id,
            current,
            instruction: instruction.to_string(),
        })
    }

    /// On success the refined proposal becomes the edit draft; the confirmed
    /// proposal and the store are untouched until [`Session::save_edit`].
    pub fn finish_refine(
        &mut self,
        ticket: RefineTicket,
        result: Result<ActivityDetail, GenerationError>,
    ) -> ActionOutcome {
        if !self.refine_seq.is_current(ticket.id) {
            tracing::debug!(request = ticket.id, "discarding stale refine response");
            return ActionOutcome::Stale;
        }
        let Some(view) = self.detail.as_mut() else {
            return ActionOutcome::Stale;
        };
        view.refining = false;
        match result {
            Ok(refined) => {
                view.draft = Some(refined);
                ActionOutcome::Applied
            }
            Err(err) => {
                view.refine_error = Some(failure_message(REFINE_ERROR_MESSAGE, &err));
                ActionOutcome::Failed
            }
        }
    }

    pub async fn refine(&mut self, instruction: &str) -> ActionOutcome {
        let ticket = match self.begin_refine(instruction) {
            Ok(ticket) => ticket,
            Err(err) => return ActionOutcome::Rejected(err),
        };
        let result = ticket.run(&self.generator).await;
        self.finish_refine(ticket, result)
    }

    // ------------------------------------------------------------------
    // Edit
    // ------------------------------------------------------------------

    /// Starts editing a copy of the confirmed proposal. Keeps an existing draft.
    pub fn begin_edit(&mut self) -> Result<(), ValidationError> {
        let view = self.detail.as_mut().ok_or(ValidationError::NoDetail)?;
        if view.draft.is_none() {
            let confirmed = view.detail().cloned().ok_or(ValidationError::NoDetail)?;
            view.draft = Some(confirmed);
        }
        Ok(())
    }

    pub fn draft_mut(&mut self) -> Option<&mut ActivityDetail> {
        self.detail.as_mut().and_then(|view| view.draft.as_mut())
    }

    pub fn set_draft_field(&mut self, field: DetailField, raw: &str) -> Result<(), ValidationError> {
        let draft = self.draft_mut().ok_or(ValidationError::NotEditing)?;
        draft.set_field(field, raw);
        Ok(())
    }

    /// Confirms the draft, updating the saved copy with the same title if any.
    ///
    /// The draft is kept when the store write fails.
    pub fn save_edit(&mut self) -> anyhow::Result<()> {
        let draft = self
            .detail
            .as_ref()
            .and_then(|view| view.draft.clone())
            .ok_or(ValidationError::NotEditing)?;

        if self.store.update_by_title(&draft)? {
            tracing::info!(title = %draft.title, "saved proposal updated");
        }
        if let Some(view) = self.detail.as_mut() {
            view.status = DetailStatus::Ready(draft);
            view.draft = None;
            view.refine_error = None;
        }
        Ok(())
    }

    /// Drops the draft and returns to the confirmed proposal.
    pub fn cancel_edit(&mut self) -> Result<(), ValidationError> {
        let view = self.detail.as_mut().ok_or(ValidationError::NotEditing)?;
        if view.draft.take().is_none() {
            return Err(ValidationError::NotEditing);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Saved proposals
    // ------------------------------------------------------------------

    /// Whether the proposal on screen (the draft while editing) is in the store.
    pub fn is_displayed_saved(&self) -> bool {
        self.detail
            .as_ref()
            .and_then(DetailView::displayed)
            .is_some_and(|detail| self.store.is_saved(&detail.title))
    }

    /// Saves or unsaves the confirmed proposal; returns whether it is saved afterwards.
    ///
    /// Refused while a draft is open, since the draft is what is on screen.
    pub fn toggle_save(&mut self) -> anyhow::Result<bool> {
        let view = self.detail.as_ref().ok_or(ValidationError::NoDetail)?;
        if view.is_editing() {
            return Err(ValidationError::EditInProgress.into());
        }
        let detail = view.detail().ok_or(ValidationError::NoDetail)?;

        if let Some(existing) = self.store.find_by_title(&detail.title) {
            let id = existing.id.clone();
            self.store.remove(&id)?;
            tracing::info!(title = %detail.title, "proposal unsaved");
            return Ok(false);
        }

        let label = view.origin_label.clone();
        let detail = detail.clone();
        self.store.add(detail, label)?;
        Ok(true)
    }

    pub fn delete_saved(&mut self, id: &str) -> anyhow::Result<bool> {
        self.store.remove(id)
    }
}
