//! In-process persistence.
//!
//! Plain maps behind one `RwLock`. Every mutating operation holds the write
//! lock for its whole check-then-act sequence, so a uniqueness check and the
//! insert it guards are atomic under concurrent requests. Guards are never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::access::{Role, Visibility};

pub mod models;

pub use models::{
    Note, Project, ProjectStatus, Session, Setting, SettingKind, Task, TaskPriority, TaskStatus,
    User,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(String),
}

/// One page of a filtered listing plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub salt: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    /// Pre-generated by the caller; doubles as the JWT `sid` claim.
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub token_fingerprint: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub owner_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewSetting {
    pub user_id: Uuid,
    pub key: String,
    pub value: String,
    pub kind: SettingKind,
    pub category: String,
    pub visibility: Visibility,
}

#[derive(Debug, Default)]
pub struct SettingPatch {
    pub key: Option<String>,
    pub value: Option<String>,
    pub kind: Option<SettingKind>,
    pub category: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Default)]
struct StoreInner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
    notes: HashMap<Uuid, Note>,
    settings: HashMap<Uuid, Setting>,
    user_seq: i64,
    session_seq: i64,
    project_seq: i64,
    task_seq: i64,
    note_seq: i64,
    setting_seq: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

fn page_of<T: Clone>(
    map: &HashMap<Uuid, T>,
    keep: impl Fn(&T) -> bool,
    id_of: impl Fn(&T) -> i64,
    page: usize,
    limit: usize,
) -> Page<T> {
    let mut items: Vec<T> = map.values().filter(|item| keep(item)).cloned().collect();
    items.sort_by_key(|item| id_of(item));
    let total = items.len();
    let start = page.saturating_sub(1).saturating_mul(limit);
    let items = items.into_iter().skip(start).take(limit).collect();
    Page { items, total }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock means a writer panicked; the data is plain maps, so
    // continuing with the inner value is still coherent.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // -- users ------------------------------------------------------------

    pub fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write();
        if inner.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate("username already taken".to_string()));
        }
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("email already registered".to_string()));
        }
        inner.user_seq += 1;
        let now = Utc::now();
        let user = User {
            id: inner.user_seq,
            uuid: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            salt: new.salt,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.uuid, user.clone());
        Ok(user)
    }

    pub fn find_user(&self, uuid: Uuid) -> Option<User> {
        self.read().users.get(&uuid).cloned()
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn list_users(
        &self,
        keep: impl Fn(&User) -> bool,
        page: usize,
        limit: usize,
    ) -> Page<User> {
        page_of(&self.read().users, keep, |u| u.id, page, limit)
    }

    pub fn update_user(&self, uuid: Uuid, patch: UserPatch) -> Result<User, StoreError> {
        let mut inner = self.write();
        if !inner.users.contains_key(&uuid) {
            return Err(StoreError::NotFound("user"));
        }
        if let Some(username) = &patch.username {
            if inner
                .users
                .values()
                .any(|u| u.uuid != uuid && u.username == *username)
            {
                return Err(StoreError::Duplicate("username already taken".to_string()));
            }
        }
        if let Some(email) = &patch.email {
            if inner
                .users
                .values()
                .any(|u| u.uuid != uuid && u.email == *email)
            {
                return Err(StoreError::Duplicate("email already registered".to_string()));
            }
        }
        let user = inner
            .users
            .get_mut(&uuid)
            .ok_or(StoreError::NotFound("user"))?;
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(salt) = patch.salt {
            user.salt = salt;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    /// Removes the user and everything only they could justify keeping:
    /// their sessions are revoked, owned projects (with contained tasks and
    /// notes) and owned tasks/notes go away, and their settings survive
    /// orphaned with `user_id = None`.
    pub fn delete_user(&self, uuid: Uuid) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.users.remove(&uuid).is_none() {
            return Err(StoreError::NotFound("user"));
        }
        let now = Utc::now();
        for session in inner.sessions.values_mut().filter(|s| s.user_id == uuid) {
            session.revoked_at.get_or_insert(now);
        }
        let dead_projects: Vec<Uuid> = inner
            .projects
            .values()
            .filter(|p| p.owner_id == uuid)
            .map(|p| p.uuid)
            .collect();
        for project in &dead_projects {
            inner.projects.remove(project);
        }
        inner
            .tasks
            .retain(|_, t| t.owner_id != uuid && !dead_projects.contains(&t.project_id));
        inner.notes.retain(|_, n| {
            n.owner_id != uuid && n.project_id.map_or(true, |p| !dead_projects.contains(&p))
        });
        for setting in inner
            .settings
            .values_mut()
            .filter(|s| s.user_id == Some(uuid))
        {
            setting.user_id = None;
            setting.updated_at = now;
        }
        Ok(())
    }

    // -- sessions ---------------------------------------------------------

    pub fn create_session(&self, new: NewSession) -> Session {
        let mut inner = self.write();
        inner.session_seq += 1;
        let session = Session {
            id: inner.session_seq,
            uuid: new.uuid,
            user_id: new.user_id,
            token_fingerprint: new.token_fingerprint,
            expires_at: new.expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        };
        inner.sessions.insert(session.uuid, session.clone());
        session
    }

    pub fn find_session(&self, uuid: Uuid) -> Option<Session> {
        self.read().sessions.get(&uuid).cloned()
    }

    /// Revoking twice keeps the first timestamp.
    pub fn revoke_session(&self, uuid: Uuid) -> Result<Session, StoreError> {
        let mut inner = self.write();
        let session = inner
            .sessions
            .get_mut(&uuid)
            .ok_or(StoreError::NotFound("session"))?;
        session.revoked_at.get_or_insert(Utc::now());
        Ok(session.clone())
    }

    pub fn sessions_for_user(&self, user_id: Uuid) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .read()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    // -- projects ----------------------------------------------------------

    pub fn create_project(&self, new: NewProject) -> Project {
        let mut inner = self.write();
        inner.project_seq += 1;
        let now = Utc::now();
        let project = Project {
            id: inner.project_seq,
            uuid: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        inner.projects.insert(project.uuid, project.clone());
        project
    }

    pub fn find_project(&self, uuid: Uuid) -> Option<Project> {
        self.read().projects.get(&uuid).cloned()
    }

    pub fn list_projects(
        &self,
        keep: impl Fn(&Project) -> bool,
        page: usize,
        limit: usize,
    ) -> Page<Project> {
        page_of(&self.read().projects, keep, |p| p.id, page, limit)
    }

    pub fn update_project(&self, uuid: Uuid, patch: ProjectPatch) -> Result<Project, StoreError> {
        let mut inner = self.write();
        let project = inner
            .projects
            .get_mut(&uuid)
            .ok_or(StoreError::NotFound("project"))?;
        if let Some(name) = patch.name {
            project.name = name;
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    /// Tasks cannot exist without their project and are removed with it;
    /// notes can stand alone and are detached instead.
    pub fn delete_project(&self, uuid: Uuid) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.projects.remove(&uuid).is_none() {
            return Err(StoreError::NotFound("project"));
        }
        inner.tasks.retain(|_, t| t.project_id != uuid);
        let now = Utc::now();
        for note in inner
            .notes
            .values_mut()
            .filter(|n| n.project_id == Some(uuid))
        {
            note.project_id = None;
            note.updated_at = now;
        }
        Ok(())
    }

    // -- tasks --------------------------------------------------------------

    pub fn create_task(&self, new: NewTask) -> Task {
        let mut inner = self.write();
        inner.task_seq += 1;
        let now = Utc::now();
        let task = Task {
            id: inner.task_seq,
            uuid: Uuid::new_v4(),
            owner_id: new.owner_id,
            project_id: new.project_id,
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            tags: new.tags,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(task.uuid, task.clone());
        task
    }

    pub fn find_task(&self, uuid: Uuid) -> Option<Task> {
        self.read().tasks.get(&uuid).cloned()
    }

    pub fn list_tasks(
        &self,
        keep: impl Fn(&Task) -> bool,
        page: usize,
        limit: usize,
    ) -> Page<Task> {
        page_of(&self.read().tasks, keep, |t| t.id, page, limit)
    }

    pub fn update_task(&self, uuid: Uuid, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut inner = self.write();
        let task = inner
            .tasks
            .get_mut(&uuid)
            .ok_or(StoreError::NotFound("task"))?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(project_id) = patch.project_id {
            task.project_id = project_id;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(tags) = patch.tags {
            task.tags = tags;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    pub fn delete_task(&self, uuid: Uuid) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner
            .tasks
            .remove(&uuid)
            .map(|_| ())
            .ok_or(StoreError::NotFound("task"))
    }

    // -- notes --------------------------------------------------------------

    pub fn create_note(&self, new: NewNote) -> Note {
        let mut inner = self.write();
        inner.note_seq += 1;
        let now = Utc::now();
        let note = Note {
            id: inner.note_seq,
            uuid: Uuid::new_v4(),
            owner_id: new.owner_id,
            project_id: new.project_id,
            title: new.title,
            content: new.content,
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(note.uuid, note.clone());
        note
    }

    pub fn find_note(&self, uuid: Uuid) -> Option<Note> {
        self.read().notes.get(&uuid).cloned()
    }

    pub fn list_notes(
        &self,
        keep: impl Fn(&Note) -> bool,
        page: usize,
        limit: usize,
    ) -> Page<Note> {
        page_of(&self.read().notes, keep, |n| n.id, page, limit)
    }

    pub fn update_note(&self, uuid: Uuid, patch: NotePatch) -> Result<Note, StoreError> {
        let mut inner = self.write();
        let note = inner
            .notes
            .get_mut(&uuid)
            .ok_or(StoreError::NotFound("note"))?;
        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(project_id) = patch.project_id {
            note.project_id = Some(project_id);
        }
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    pub fn delete_note(&self, uuid: Uuid) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner
            .notes
            .remove(&uuid)
            .map(|_| ())
            .ok_or(StoreError::NotFound("note"))
    }

    // -- settings -----------------------------------------------------------

    /// Key uniqueness is scoped to the owning user, never global. The check
    /// and the insert share one write guard.
    pub fn create_setting(&self, new: NewSetting) -> Result<Setting, StoreError> {
        let mut inner = self.write();
        if inner
            .settings
            .values()
            .any(|s| s.user_id == Some(new.user_id) && s.key == new.key)
        {
            return Err(StoreError::Duplicate(format!(
                "setting key '{}' already exists for this user",
                new.key
            )));
        }
        inner.setting_seq += 1;
        let now = Utc::now();
        let setting = Setting {
            id: inner.setting_seq,
            uuid: Uuid::new_v4(),
            user_id: Some(new.user_id),
            key: new.key,
            value: new.value,
            kind: new.kind,
            category: new.category,
            visibility: new.visibility,
            created_at: now,
            updated_at: now,
        };
        inner.settings.insert(setting.uuid, setting.clone());
        Ok(setting)
    }

    pub fn find_setting(&self, uuid: Uuid) -> Option<Setting> {
        self.read().settings.get(&uuid).cloned()
    }

    pub fn list_settings(
        &self,
        keep: impl Fn(&Setting) -> bool,
        page: usize,
        limit: usize,
    ) -> Page<Setting> {
        page_of(&self.read().settings, keep, |s| s.id, page, limit)
    }

    /// A key change re-checks uniqueness in the owner's scope, excluding the
    /// setting being renamed.
    pub fn update_setting(&self, uuid: Uuid, patch: SettingPatch) -> Result<Setting, StoreError> {
        let mut inner = self.write();
        let owner = match inner.settings.get(&uuid) {
            Some(setting) => setting.user_id,
            None => return Err(StoreError::NotFound("setting")),
        };
        if let Some(key) = &patch.key {
            if inner
                .settings
                .values()
                .any(|s| s.uuid != uuid && s.user_id == owner && s.key == *key)
            {
                return Err(StoreError::Duplicate(format!(
                    "setting key '{}' already exists for this user",
                    key
                )));
            }
        }
        let setting = inner
            .settings
            .get_mut(&uuid)
            .ok_or(StoreError::NotFound("setting"))?;
        if let Some(key) = patch.key {
            setting.key = key;
        }
        if let Some(value) = patch.value {
            setting.value = value;
        }
        if let Some(kind) = patch.kind {
            setting.kind = kind;
        }
        if let Some(category) = patch.category {
            setting.category = category;
        }
        if let Some(visibility) = patch.visibility {
            setting.visibility = visibility;
        }
        setting.updated_at = Utc::now();
        Ok(setting.clone())
    }

    pub fn delete_setting(&self, uuid: Uuid) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner
            .settings
            .remove(&uuid)
            .map(|_| ())
            .ok_or(StoreError::NotFound("setting"))
    }
}
