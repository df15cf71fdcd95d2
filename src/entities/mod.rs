//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod admin;
pub mod admin_alliance;
pub mod alliance;
pub mod gift_code;
pub mod member;
pub mod member_history;
pub mod monitoring;
pub mod redemption_job;
pub mod redemption_log;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use admin::{Column as AdminColumn, Entity as Admin, Model as AdminModel};
pub use admin_alliance::{
    Column as AdminAllianceColumn, Entity as AdminAlliance, Model as AdminAllianceModel,
};
pub use alliance::{Column as AllianceColumn, Entity as Alliance, Model as AllianceModel};
pub use gift_code::{
    CodeStatus, Column as GiftCodeColumn, Entity as GiftCode, Model as GiftCodeModel,
};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use member_history::{
    Column as MemberHistoryColumn, Entity as MemberHistory, Model as MemberHistoryModel,
};
pub use monitoring::{Column as MonitoringColumn, Entity as Monitoring, Model as MonitoringModel};
pub use redemption_job::{
    Column as RedemptionJobColumn, Entity as RedemptionJob, Model as RedemptionJobModel,
};
pub use redemption_log::{
    Column as RedemptionLogColumn, Entity as RedemptionLog, Model as RedemptionLogModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
