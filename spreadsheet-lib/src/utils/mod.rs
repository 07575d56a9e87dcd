mod datetime;
mod filesystem;
mod string;

pub use datetime::{excel_serial_to_epoch, get_utc_iso_datetime, parse_datetime_to_epoch};
pub use filesystem::write_error_to_log;
pub use string::{is_blank, normalize_header, value_to_text};
