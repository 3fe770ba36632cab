//! The create/edit modal shared by every list page.
//!
//! [`ModalController`] holds the session mode and an explicit [`ModalView`];
//! the browser side renders the view and executes the returned
//! [`ListCommand`]s. Nothing here reads state back from the DOM.

use serde::{Deserialize, Serialize};

use crate::locale;
use crate::request::RequestError;
use crate::rows::{RowPatch, SuccessPolicy, row_dom_id};

fn default_form_content_id() -> String {
    "modal-form-content".into()
}

fn default_modal_title_id() -> String {
    "modal-title".into()
}

fn default_modal_header_id() -> String {
    "modal-header".into()
}

fn default_pk_form_field() -> String {
    "id".into()
}

fn default_row_id_prefix() -> String {
    "row-".into()
}

/// Page configuration, embedded once as JSON and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPageConfig {
    pub modal_id: String,
    pub table_body_id: String,
    pub form_id: String,
    #[serde(default = "default_form_content_id")]
    pub form_content_id: String,
    #[serde(default = "default_modal_title_id")]
    pub modal_title_id: String,
    #[serde(default = "default_modal_header_id")]
    pub modal_header_id: String,
    pub create: ModeConfig,
    pub edit: ModeConfig,
    #[serde(default)]
    pub features: FormFeatures,
    #[serde(default = "default_pk_form_field")]
    pub pk_form_field: String,
    #[serde(default = "default_row_id_prefix")]
    pub row_id_prefix: String,
    #[serde(default)]
    pub on_success: SuccessPolicy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeConfig {
    pub title: String,
    #[serde(default)]
    pub form_action: String,
    #[serde(default)]
    pub header_class: String,
    #[serde(default)]
    pub form_html: String,
}

impl ModeConfig {
    pub fn header_classes(&self) -> impl Iterator<Item = &str> {
        self.header_class.split_whitespace()
    }
}

/// Behaviours re-applied every time form markup is (re)rendered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFeatures {
    #[serde(default)]
    pub towns_url: Option<String>,
    #[serde(default, alias = "hasFlatpickr")]
    pub date_picker: bool,
}

/// `{success, html}` as returned by the edit-form and save endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentResponse {
    pub success: bool,
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalMode {
    Create,
    Edit { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormContent {
    /// The create form as shipped with the page.
    Pristine,
    Loading,
    Fragment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub visible: bool,
    pub content: FormContent,
    /// Bumped whenever `content` is replaced; the renderer re-injects markup
    /// and re-binds form behaviours when it changes.
    pub content_revision: u64,
    pub submitting: bool,
    pub errors: Vec<String>,
}

impl ModalView {
    pub fn submit_caption(&self) -> &'static str {
        if self.submitting {
            locale::SAVING_CAPTION
        } else {
            locale::SAVE_CAPTION
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCommand {
    FetchEditForm { url: String },
    SubmitForm { action: String },
    SubmitDelete { action: String },
    PatchRows(RowPatch),
    ReloadPage,
    ScrollToFirstError,
    Alert(String),
    /// Stamp the self-update token so our own broadcast does not toast.
    MarkSelfUpdate,
}

#[derive(Debug, Clone)]
pub struct ModalController {
    config: ListPageConfig,
    mode: ModalMode,
    view: ModalView,
}

impl ModalController {
    pub fn new(config: ListPageConfig) -> Self {
        Self {
            config,
            mode: ModalMode::Create,
            view: ModalView {
                visible: false,
                content: FormContent::Pristine,
                content_revision: 0,
                submitting: false,
                errors: Vec::new(),
            },
        }
    }

    pub fn config(&self) -> &ListPageConfig {
        &self.config
    }

    pub fn mode(&self) -> &ModalMode {
        &self.mode
    }

    pub fn view(&self) -> &ModalView {
        &self.view
    }

    fn mode_config(&self) -> &ModeConfig {
        match self.mode {
            ModalMode::Create => &self.config.create,
            ModalMode::Edit { .. } => &self.config.edit,
        }
    }

    fn other_mode_config(&self) -> &ModeConfig {
        match self.mode {
            ModalMode::Create => &self.config.edit,
            ModalMode::Edit { .. } => &self.config.create,
        }
    }

    pub fn title(&self) -> &str {
        &self.mode_config().title
    }

    /// Header classes to add for the current mode.
    pub fn header_classes(&self) -> Vec<&str> {
        self.mode_config().header_classes().collect()
    }

    /// Header classes of the other mode, to remove.
    pub fn stale_header_classes(&self) -> Vec<&str> {
        self.other_mode_config().header_classes().collect()
    }

    pub fn form_action(&self) -> &str {
        match &self.mode {
            ModalMode::Create => &self.config.create.form_action,
            ModalMode::Edit { url } => url,
        }
    }

    pub fn pristine_html(&self) -> &str {
        &self.config.create.form_html
    }

    fn set_content(&mut self, content: FormContent) {
        self.view.content = content;
        self.view.content_revision = self.view.content_revision.wrapping_add(1);
    }

    pub fn switch_to_create_mode(&mut self) {
        self.mode = ModalMode::Create;
        self.set_content(FormContent::Pristine);
        self.view.errors.clear();
        self.view.visible = true;
    }

    /// Opens the modal with a loading placeholder before the fragment fetch
    /// is issued.
    pub fn switch_to_edit_mode(&mut self, url: &str) -> Vec<ListCommand> {
        self.mode = ModalMode::Edit {
            url: url.to_string(),
        };
        self.set_content(FormContent::Loading);
        self.view.errors.clear();
        self.view.visible = true;
        vec![ListCommand::FetchEditForm {
            url: url.to_string(),
        }]
    }

    pub fn on_edit_form(
        &mut self,
        url: &str,
        result: Result<FragmentResponse, RequestError>,
    ) -> Vec<ListCommand> {
        let awaiting = self.view.visible
            && self.view.content == FormContent::Loading
            && matches!(&self.mode, ModalMode::Edit { url: current } if current == url);
        if !awaiting {
            return Vec::new();
        }

        match result {
            Ok(FragmentResponse {
                success: true,
                html: Some(html),
            }) => {
                self.set_content(FormContent::Fragment(html));
                Vec::new()
            }
            _ => {
                self.close();
                vec![ListCommand::Alert(locale::EDIT_LOAD_FAILED.into())]
            }
        }
    }

    /// Start a save. Returns nothing while a save is already in flight.
    pub fn begin_submit(&mut self) -> Vec<ListCommand> {
        if self.view.submitting {
            return Vec::new();
        }
        self.view.errors.clear();
        self.view.submitting = true;
        vec![
            ListCommand::MarkSelfUpdate,
            ListCommand::SubmitForm {
                action: self.form_action().to_string(),
            },
        ]
    }

    /// Resolve a save. `pk` is the submitted record's primary key, if known.
    pub fn on_submit_result(
        &mut self,
        result: Result<FragmentResponse, RequestError>,
        pk: Option<String>,
    ) -> Vec<ListCommand> {
        self.view.submitting = false;

        match result {
            Ok(FragmentResponse {
                success: true,
                html,
            }) => {
                let command = match (self.config.on_success, html) {
                    (SuccessPolicy::Patch, Some(html)) => {
                        ListCommand::PatchRows(self.row_patch(html, pk))
                    }
                    _ => ListCommand::ReloadPage,
                };
                self.close();
                vec![command]
            }
            Ok(FragmentResponse {
                success: false,
                html: Some(html),
            }) => {
                self.set_content(FormContent::Fragment(html));
                vec![ListCommand::ScrollToFirstError]
            }
            Ok(FragmentResponse {
                success: false,
                html: None,
            }) => {
                self.view.errors = vec![locale::SAVE_FAILED.to_string()];
                Vec::new()
            }
            Err(e) => {
                self.view.errors = vec![e.user_message(locale::SAVE_FAILED)];
                Vec::new()
            }
        }
    }

    fn row_patch(&self, html: String, pk: Option<String>) -> RowPatch {
        match (&self.mode, pk) {
            (ModalMode::Edit { .. }, Some(pk)) => RowPatch::Replace {
                row_id: row_dom_id(&self.config.row_id_prefix, &pk),
                html,
            },
            _ => RowPatch::InsertTop { html },
        }
    }

    /// Hide the modal and put the pristine create form back.
    pub fn close(&mut self) {
        self.view.visible = false;
        self.view.errors.clear();
        self.mode = ModalMode::Create;
        self.set_content(FormContent::Pristine);
    }

    /// A delete that the user did not confirm issues no request.
    pub fn request_delete(&self, confirmed: bool, action: &str) -> Vec<ListCommand> {
        if !confirmed {
            return Vec::new();
        }
        vec![
            ListCommand::MarkSelfUpdate,
            ListCommand::SubmitDelete {
                action: action.to_string(),
            },
        ]
    }

    pub fn on_delete_result(
        &self,
        row_id: Option<String>,
        result: Result<(), RequestError>,
    ) -> Vec<ListCommand> {
        match (result, self.config.on_success, row_id) {
            (Err(e), _, _) => vec![ListCommand::Alert(e.user_message(locale::DELETE_FAILED))],
            (Ok(()), SuccessPolicy::Patch, Some(row_id)) => {
                vec![ListCommand::PatchRows(RowPatch::Remove { row_id })]
            }
            (Ok(()), _, _) => vec![ListCommand::ReloadPage],
        }
    }
}
