//! SeaORM entity models

mod video_summary;

pub use video_summary::{
    Entity as VideoSummaryEntity,
    Model as VideoSummary,
    ActiveModel as VideoSummaryActiveModel,
    Column as VideoSummaryColumn,
};
