use kismap_rs::KismapError;

pub const SUCCESS: i32 = 0;
/// Missing or unreadable capture
pub const INPUT_ERROR: i32 = 1;
/// Invalid filter value (same code clap uses for usage errors)
pub const FILTER_ERROR: i32 = 2;
/// Output could not be written
pub const IO_ERROR: i32 = 3;
pub const RENDER_ERROR: i32 = 4;

pub fn for_error(err: &KismapError) -> i32 {
    match err {
        KismapError::Input(_) | KismapError::Database(_) => INPUT_ERROR,
        KismapError::Filter(_) => FILTER_ERROR,
        KismapError::Io(_)
        | KismapError::Write { .. }
        | KismapError::OutputConflict { .. }
        | KismapError::Csv(_)
        | KismapError::Json(_) => IO_ERROR,
        KismapError::Render(_) => RENDER_ERROR,
    }
}
