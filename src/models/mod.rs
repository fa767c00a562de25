pub mod task;
pub mod user;

pub use task::{
    ChecklistUpdate, CreateTaskInput, StatusSummary, StatusUpdate, Task, TaskDetail,
    TaskListItem, TaskListResponse, TaskPriority, TaskQuery, TaskStatus, TodoItem,
    UpdateTaskInput,
};
pub use user::{
    normalize_email, NewUser, Role, User, UserChanges, UserProfile, UserRef, UserTaskCounts,
};
