use sauron::{
    html::{attributes, attributes::*, *},
    prelude::*,
};
use shared::{Task, UpdateTaskRequest};
use uuid::Uuid;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{console, window};

pub mod alert;
pub mod api;
pub mod manager;
pub mod storage;

use alert::{AlertKind, AlertState};
use manager::{export_file_name, Adoption, Filter, ManagerError, TaskManager};
use storage::LocalStorageRepository;

const ALERT_MS: i32 = 3000;

#[derive(Debug, Clone)]
pub enum Msg {
    SetInput(String),
    InputKey(String),
    AddTask,
    ToggleTask(usize),
    EditTask(usize),
    SetDraft(String),
    DraftKey(String),
    SaveEdit,
    CancelEdit,
    DeleteTask(usize),
    ClearAll,
    SetFilter(Filter),
    GenerateSummary,
    SendSummary,
    SummarySent(Result<String, String>),
    Export,
    SetImportText(String),
    Import,
    ToggleMirror,
    LoadFromServer,
    ServerLoaded(Vec<Task>),
    MirrorStarted(Vec<Task>),
    // a mirrored create came back with the server's record
    Created(Uuid, Task),
    CreateFailed(Uuid, String),
    Synced,
    DismissAlert(u32),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Model {
    manager: TaskManager<LocalStorageRepository>,
    input: String,
    filter: Filter,
    summary: String,
    import_text: String,
    mirror: bool,
    loading: bool,
    alerts: AlertState,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            manager: TaskManager::load(LocalStorageRepository),
            input: String::new(),
            filter: Filter::All,
            summary: String::new(),
            import_text: String::new(),
            mirror: false,
            loading: false,
            alerts: AlertState::default(),
        }
    }
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        console::log_1(&format!("Loaded {} todos from local storage", self.manager.tasks().len()).into());
        Cmd::none()
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::SetInput(input) => {
                self.input = input;
                Cmd::none()
            }
            Msg::InputKey(key) => match key_command(&key, false) {
                Some(msg) => self.update(msg),
                None => Cmd::none(),
            },
            Msg::AddTask => match self.manager.add(&self.input) {
                Ok(task) => {
                    let task = task.clone();
                    self.input.clear();
                    let alert = self.alert("Todo Added Successfully!", AlertKind::Success);
                    if self.mirror {
                        Cmd::batch(vec![alert, self.mirror_create(task)])
                    } else {
                        alert
                    }
                }
                Err(ManagerError::Validation(_)) => {
                    self.alert("Please enter a todo item!", AlertKind::Info)
                }
                Err(e) => self.fail(e),
            },
            Msg::ToggleTask(index) => match self.manager.toggle(index) {
                Ok(task) => {
                    let (id, completed) = (task.id, task.completed);
                    let alert = if completed {
                        self.alert("Task completed! 🎉", AlertKind::Success)
                    } else {
                        self.alert("Task marked as pending", AlertKind::Info)
                    };
                    if self.manager.all_complete() {
                        console::log_1(&"All todos complete 🎉".into());
                    }
                    self.mirror_update(
                        alert,
                        id,
                        UpdateTaskRequest {
                            text: None,
                            completed: Some(completed),
                        },
                    )
                }
                Err(e) => self.fail(e),
            },
            Msg::EditTask(index) => match self.manager.begin_edit(index) {
                Ok(()) => Cmd::none(),
                Err(e) => self.fail(e),
            },
            Msg::SetDraft(draft) => {
                self.manager.set_draft(draft);
                Cmd::none()
            }
            Msg::DraftKey(key) => match key_command(&key, true) {
                Some(msg) => self.update(msg),
                None => Cmd::none(),
            },
            Msg::SaveEdit => match self.manager.save_edit() {
                Ok(task) => {
                    let (id, text) = (task.id, task.text.clone());
                    let alert = self.alert("Todo updated successfully!", AlertKind::Success);
                    self.mirror_update(
                        alert,
                        id,
                        UpdateTaskRequest {
                            text: Some(text),
                            completed: None,
                        },
                    )
                }
                Err(ManagerError::Validation(_)) => {
                    self.alert("Todo text cannot be empty!", AlertKind::Info)
                }
                Err(e) => self.fail(e),
            },
            Msg::CancelEdit => {
                self.manager.cancel_edit();
                Cmd::none()
            }
            Msg::DeleteTask(index) => {
                if !confirm("Are you sure you want to delete this todo?") {
                    return Cmd::none();
                }
                match self.manager.remove(index) {
                    Ok(task) => {
                        let alert = self.alert("Todo Deleted!", AlertKind::Success);
                        // a task still being created is deleted once its id arrives
                        if self.mirror && !self.manager.is_pending(task.id) {
                            Cmd::batch(vec![alert, mirror_delete(task.id)])
                        } else {
                            alert
                        }
                    }
                    Err(e) => self.fail(e),
                }
            }
            Msg::ClearAll => {
                if self.manager.tasks().is_empty() {
                    return self.alert("No todos to clear!", AlertKind::Info);
                }
                if !confirm("Clear all todos?") {
                    return Cmd::none();
                }
                let ids: Vec<Uuid> = self
                    .manager
                    .tasks()
                    .iter()
                    .map(|t| t.id)
                    .filter(|id| !self.manager.is_pending(*id))
                    .collect();
                match self.manager.clear() {
                    Ok(_) => {
                        self.summary.clear();
                        let alert = self.alert("All Todos Cleared!", AlertKind::Success);
                        if self.mirror {
                            let mut cmds = vec![alert];
                            cmds.extend(ids.into_iter().map(mirror_delete));
                            Cmd::batch(cmds)
                        } else {
                            alert
                        }
                    }
                    Err(e) => self.fail(e),
                }
            }
            Msg::SetFilter(filter) => {
                self.filter = filter;
                Cmd::none()
            }
            Msg::GenerateSummary => {
                let now = chrono::Local::now().naive_local();
                match self.manager.summary(&now) {
                    Ok(summary) => {
                        self.summary = summary;
                        self.alert("Summary generated successfully! 📋✨", AlertKind::Success)
                    }
                    Err(ManagerError::NothingToSummarize) => {
                        self.alert("No todos to summarize!", AlertKind::Info)
                    }
                    Err(e) => self.fail(e),
                }
            }
            Msg::SendSummary => {
                self.loading = true;
                Cmd::new(async {
                    Msg::SummarySent(api::summarize().await.map(|response| response.message))
                })
            }
            Msg::SummarySent(result) => {
                self.loading = false;
                match result {
                    Ok(message) => self.alert(&message, AlertKind::Success),
                    Err(e) => self.alert(&e, AlertKind::Danger),
                }
            }
            Msg::Export => {
                let now = chrono::Utc::now();
                let result = self
                    .manager
                    .export_json()
                    .map_err(|e| e.to_string())
                    .and_then(|json| download(&export_file_name(&now), &json));
                match result {
                    Ok(()) => self.alert("Todos exported successfully! 📥", AlertKind::Success),
                    Err(e) => self.alert(&e, AlertKind::Danger),
                }
            }
            Msg::SetImportText(text) => {
                self.import_text = text;
                Cmd::none()
            }
            Msg::Import => match self.manager.import_json(&self.import_text) {
                Ok(count) => {
                    self.import_text.clear();
                    self.alert(&format!("Imported {} todos", count), AlertKind::Success)
                }
                Err(e) => self.fail(e),
            },
            Msg::ToggleMirror => {
                self.mirror = !self.mirror;
                if !self.mirror {
                    return Cmd::none();
                }
                Cmd::new(async {
                    match api::fetch_tasks().await {
                        Ok(tasks) => Msg::MirrorStarted(tasks),
                        Err(e) => Msg::Error(e),
                    }
                })
            }
            Msg::MirrorStarted(remote) => {
                let missing = self.manager.missing_from(&remote);
                if missing.is_empty() {
                    return Cmd::none();
                }
                console::log_1(&format!("Pushing {} local todos to the server", missing.len()).into());
                let cmds: Vec<Cmd<Msg>> = missing
                    .into_iter()
                    .map(|task| self.mirror_create(task))
                    .collect();
                Cmd::batch(cmds)
            }
            Msg::LoadFromServer => {
                self.loading = true;
                Cmd::new(async {
                    match api::fetch_tasks().await {
                        Ok(tasks) => Msg::ServerLoaded(tasks),
                        Err(e) => Msg::Error(e),
                    }
                })
            }
            Msg::ServerLoaded(tasks) => {
                self.loading = false;
                match self.manager.replace_all(tasks) {
                    Ok(count) => self.alert(&format!("Loaded {} todos from server", count), AlertKind::Success),
                    Err(e) => self.fail(e),
                }
            }
            Msg::Created(local_id, task) => match self.manager.adopt(local_id, task) {
                Ok(Adoption::InSync) => Cmd::none(),
                // changed locally while the create was in flight
                Ok(Adoption::Diverged(id, update)) => self.mirror_update(Cmd::none(), id, update),
                Ok(Adoption::Gone(id)) => mirror_delete(id),
                Err(e) => self.fail(e),
            },
            Msg::CreateFailed(local_id, error) => {
                self.manager.forget_pending(local_id);
                self.update(Msg::Error(error))
            }
            Msg::Synced => Cmd::none(),
            Msg::DismissAlert(seq) => {
                self.alerts.dismiss(seq);
                Cmd::none()
            }
            Msg::Error(error) => {
                self.loading = false;
                console::log_1(&format!("Error: {}", error).into());
                self.alert(&error, AlertKind::Danger)
            }
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-ctp-base text-ctp-text")],
            [div(
                [class("max-w-2xl mx-auto px-4 py-8 space-y-6")],
                [
                    h1([class("text-3xl font-bold")], [text("Todo Summary Assistant 📝")]),
                    self.view_mode(),
                    self.view_alert(),
                    self.view_progress(),
                    self.view_create_form(),
                    self.view_filters(),
                    self.view_task_list(),
                    self.view_actions(),
                    self.view_summary(),
                    self.view_import(),
                ],
            )],
        )
    }
}

impl Model {
    /// Shows `message` and schedules its dismissal. A later alert replaces
    /// this one, and this one's timer then does nothing.
    fn alert(&mut self, message: &str, kind: AlertKind) -> Cmd<Msg> {
        let seq = self.alerts.show(message, kind);
        Cmd::new(async move {
            sleep(ALERT_MS).await;
            Msg::DismissAlert(seq)
        })
    }

    fn fail(&mut self, error: ManagerError) -> Cmd<Msg> {
        console::log_1(&format!("Error: {}", error).into());
        self.alert(&error.to_string(), AlertKind::Danger)
    }

    /// Creates `task` on the server. Until the answer arrives its updates
    /// stay local; adoption sends whatever changed meanwhile.
    fn mirror_create(&mut self, task: Task) -> Cmd<Msg> {
        let local_id = task.id;
        self.manager.mark_pending(local_id);
        Cmd::new(async move {
            match api::create_task(task.text).await {
                Ok(created) => Msg::Created(local_id, created),
                Err(e) => Msg::CreateFailed(local_id, e),
            }
        })
    }

    fn mirror_update(&self, alert: Cmd<Msg>, id: Uuid, update: UpdateTaskRequest) -> Cmd<Msg> {
        if !self.mirror || self.manager.is_pending(id) {
            return alert;
        }
        Cmd::batch(vec![
            alert,
            Cmd::new(async move {
                match api::update_task(id, update).await {
                    Ok(_) => Msg::Synced,
                    Err(e) => Msg::Error(e),
                }
            }),
        ])
    }

    fn view_mode(&self) -> Node<Msg> {
        div(
            [class("p-3 rounded-lg text-sm flex items-center justify-between bg-ctp-surface0 border border-ctp-surface1")],
            [
                span(
                    [class("text-ctp-green")],
                    [if self.mirror {
                        text("Synced Mode - changes are mirrored to the server")
                    } else {
                        text("Local Mode Active - Your data is saved in your browser")
                    }],
                ),
                div(
                    [class("flex gap-2")],
                    [
                        button(
                            [
                                on_click(|_| Msg::ToggleMirror),
                                class("px-3 py-1 rounded bg-ctp-surface1 hover:bg-ctp-surface2"),
                            ],
                            [text(if self.mirror { "Go local" } else { "Mirror to server" })],
                        ),
                        button(
                            [
                                on_click(|_| Msg::LoadFromServer),
                                class("px-3 py-1 rounded bg-ctp-surface1 hover:bg-ctp-surface2"),
                                disabled(self.loading),
                            ],
                            [text("Load from server")],
                        ),
                    ],
                ),
            ],
        )
    }

    fn view_alert(&self) -> Node<Msg> {
        match self.alerts.current() {
            Some(alert) => div(
                [class(&format!(
                    "p-4 rounded-lg font-medium text-ctp-base {}",
                    match alert.kind {
                        AlertKind::Success => "bg-ctp-green",
                        AlertKind::Danger => "bg-ctp-red",
                        AlertKind::Info => "bg-ctp-blue",
                    }
                ))],
                [text(&alert.message)],
            ),
            None => span([], []),
        }
    }

    fn view_progress(&self) -> Node<Msg> {
        let stats = self.manager.stats();
        div(
            [class("p-6 rounded-xl bg-ctp-surface0 border border-ctp-surface1")],
            [
                div(
                    [class("flex items-center justify-between mb-4")],
                    [
                        div(
                            [],
                            [
                                h2([class("text-lg font-semibold mb-2")], [text("Progress")]),
                                p(
                                    [class("text-sm text-ctp-subtext0")],
                                    [text(&format!(
                                        "{} of {} Tasks Completed",
                                        stats.completed, stats.total
                                    ))],
                                ),
                            ],
                        ),
                        span(
                            [class("w-16 h-16 rounded-full bg-ctp-mauve text-ctp-base font-bold flex items-center justify-center")],
                            [text(&format!("{}/{}", stats.completed, stats.total))],
                        ),
                    ],
                ),
                div(
                    [class("h-3 rounded-full overflow-hidden bg-ctp-surface2")],
                    [div(
                        [
                            class("h-full bg-ctp-blue transition-all duration-500"),
                            attributes::styles([("width", format!("{}%", stats.completion_rate))]),
                        ],
                        [],
                    )],
                ),
                if stats.all_complete() {
                    div(
                        [class("mt-4 text-center text-2xl animate-bounce")],
                        [text("🎉 Everything is done! 🎉")],
                    )
                } else {
                    span([], [])
                },
            ],
        )
    }

    fn view_create_form(&self) -> Node<Msg> {
        div(
            [class("flex gap-2")],
            [
                input(
                    [
                        r#type("text"),
                        placeholder("What needs to be done?"),
                        value(&self.input),
                        on_input(|event| Msg::SetInput(event.value())),
                        on_keydown(|event| Msg::InputKey(event.key())),
                        class("flex-1 px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md focus:outline-none focus:ring-2 focus:ring-ctp-blue"),
                    ],
                    [],
                ),
                button(
                    [
                        on_click(|_| Msg::AddTask),
                        class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md"),
                    ],
                    [text("Add")],
                ),
            ],
        )
    }

    fn view_filters(&self) -> Node<Msg> {
        div(
            [class("flex gap-2")],
            [
                self.filter_button("All", Filter::All),
                self.filter_button("Pending", Filter::Pending),
                self.filter_button("Completed", Filter::Completed),
            ],
        )
    }

    fn filter_button(&self, label: &str, filter: Filter) -> Node<Msg> {
        button(
            [
                on_click(move |_| Msg::SetFilter(filter)),
                class(&format!(
                    "px-3 py-1 rounded-full text-sm {}",
                    if self.filter == filter {
                        "bg-ctp-blue text-ctp-base"
                    } else {
                        "bg-ctp-surface0 text-ctp-subtext0 hover:bg-ctp-surface1"
                    }
                )),
            ],
            [text(label)],
        )
    }

    fn view_task_list(&self) -> Node<Msg> {
        let tasks = self.manager.filtered(self.filter);
        if tasks.is_empty() {
            return div(
                [class("text-center py-12 text-ctp-subtext0")],
                [text("No todos here. Add one above to get started!")],
            );
        }
        ul(
            [class("space-y-3")],
            tasks
                .into_iter()
                .map(|(index, task)| self.view_task(index, task))
                .collect::<Vec<_>>(),
        )
    }

    fn view_task(&self, index: usize, task: &Task) -> Node<Msg> {
        let draft = self
            .manager
            .editing()
            .filter(|session| session.id == task.id)
            .map(|session| session.draft.clone());

        li(
            [
                key(task.id.to_string()),
                class(&format!(
                    "flex items-center gap-3 p-4 rounded-xl border {}",
                    if task.completed {
                        "border-ctp-green bg-ctp-green/10"
                    } else {
                        "border-ctp-surface1 bg-ctp-surface0"
                    }
                )),
            ],
            match draft {
                Some(draft) => vec![
                    input(
                        [
                            r#type("text"),
                            value(&draft),
                            on_input(|event| Msg::SetDraft(event.value())),
                            on_keydown(|event| Msg::DraftKey(event.key())),
                            class("flex-1 px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md"),
                        ],
                        [],
                    ),
                    button(
                        [on_click(|_| Msg::SaveEdit), class("px-3 py-1 rounded bg-ctp-green text-ctp-base")],
                        [text("Save")],
                    ),
                    button(
                        [on_click(|_| Msg::CancelEdit), class("px-3 py-1 rounded bg-ctp-overlay0")],
                        [text("Cancel")],
                    ),
                ],
                None => vec![
                    input(
                        [
                            r#type("checkbox"),
                            checked(task.completed),
                            on_click(move |_| Msg::ToggleTask(index)),
                            class("w-5 h-5"),
                        ],
                        [],
                    ),
                    span(
                        [class(&format!(
                            "flex-1 break-words {}",
                            if task.completed { "line-through text-ctp-overlay1" } else { "" }
                        ))],
                        [text(&task.text)],
                    ),
                    button(
                        [
                            on_click(move |_| Msg::EditTask(index)),
                            class("w-8 h-8 rounded-lg bg-ctp-blue/20 hover:bg-ctp-blue/30"),
                        ],
                        [text("✏️")],
                    ),
                    button(
                        [
                            on_click(move |_| Msg::DeleteTask(index)),
                            class("w-8 h-8 rounded-lg bg-ctp-red/20 hover:bg-ctp-red/30"),
                        ],
                        [text("🗑️")],
                    ),
                ],
            },
        )
    }

    fn view_actions(&self) -> Node<Msg> {
        div(
            [class("flex flex-wrap gap-2")],
            [
                button(
                    [on_click(|_| Msg::GenerateSummary), class("px-4 py-2 rounded-md bg-ctp-mauve text-ctp-base")],
                    [text("Generate Summary")],
                ),
                button(
                    [
                        on_click(|_| Msg::SendSummary),
                        class("px-4 py-2 rounded-md bg-ctp-teal text-ctp-base"),
                        disabled(self.loading),
                    ],
                    [text(if self.loading { "Sending..." } else { "Send to Slack" })],
                ),
                button(
                    [on_click(|_| Msg::Export), class("px-4 py-2 rounded-md bg-ctp-surface1")],
                    [text("Export")],
                ),
                button(
                    [on_click(|_| Msg::ClearAll), class("px-4 py-2 rounded-md bg-ctp-red/20 text-ctp-red")],
                    [text("Clear All")],
                ),
            ],
        )
    }

    fn view_summary(&self) -> Node<Msg> {
        if self.summary.is_empty() {
            return span([], []);
        }
        pre(
            [class("p-4 rounded-lg bg-ctp-surface0 border border-ctp-surface1 whitespace-pre-wrap text-sm")],
            [text(&self.summary)],
        )
    }

    fn view_import(&self) -> Node<Msg> {
        div(
            [class("space-y-2")],
            [
                textarea(
                    [
                        placeholder("Paste an exported todos file to import it"),
                        value(&self.import_text),
                        on_input(|event| Msg::SetImportText(event.value())),
                        class("w-full h-24 px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md font-mono text-xs"),
                    ],
                    [],
                ),
                button(
                    [on_click(|_| Msg::Import), class("px-4 py-2 rounded-md bg-ctp-surface1")],
                    [text("Import")],
                ),
            ],
        )
    }
}

/// What a key pressed in the new-task input (or, when `editing`, the edit
/// input) asks for.
fn key_command(key: &str, editing: bool) -> Option<Msg> {
    match (key, editing) {
        ("Enter", false) => Some(Msg::AddTask),
        ("Enter", true) => Some(Msg::SaveEdit),
        ("Escape", true) => Some(Msg::CancelEdit),
        _ => None,
    }
}

fn mirror_delete(id: Uuid) -> Cmd<Msg> {
    Cmd::new(async move {
        match api::delete_task(id).await {
            Ok(()) => Msg::Synced,
            Err(e) => Msg::Error(e),
        }
    })
}

fn confirm(message: &str) -> bool {
    window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        }
    });
    let _ = JsFuture::from(promise).await;
}

/// Saves `contents` as a file through a temporary link.
fn download(file_name: &str, contents: &str) -> Result<(), String> {
    let document = window()
        .and_then(|w| w.document())
        .ok_or("No document available")?;
    let link: web_sys::HtmlAnchorElement = document
        .create_element("a")
        .map_err(|_| "Failed to create link")?
        .dyn_into()
        .map_err(|_| "Failed to create link")?;

    let encoded = String::from(js_sys::encode_uri_component(contents));
    link.set_href(&format!("data:application/json;charset=utf-8,{}", encoded));
    link.set_download(file_name);
    link.click();
    Ok(())
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(Model::default());
}
