//! Task schema, validation rules & storage definition for taskmaster.

/// Storage DDL rendered from the schema constants.
pub mod ddl;
/// Presentation-derived task fields.
pub mod display;
/// Identifier types.
pub mod id;
/// Constraint constants and closed value sets.
pub mod schema;
/// Task entity and its input/storage variants.
pub mod task;
/// Free-text search over tasks.
pub mod text_matcher;
/// Structural and business-rule validation.
pub mod validate;

pub use display::TaskDisplay;
pub use id::TaskId;
pub use schema::{
    FilterType, SchemaEnum, SortDirection, SortType, TaskCategory, TaskPriority,
};
pub use task::{
    Task, TaskCreateInput, TaskDbRecord, TaskFilterOptions, TaskInsertRecord, TaskSortOptions,
    TaskUpdateInput,
};
pub use validate::{
    OperationInput, OperationKind, TaskFields, ValidationErrors, ValidationResult,
    validate_business_constraints, validate_completion, validate_create_input,
    validate_create_operation_at, validate_db_record, validate_due_date,
    validate_filter_options, validate_operation, validate_operation_at, validate_sort_options,
    validate_task, validate_update_input, validate_update_operation_at,
};
