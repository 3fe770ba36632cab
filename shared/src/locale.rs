//! User-facing strings (zh-TW).

// List page modal
pub const SAVE_CAPTION: &str = "儲存";
pub const SAVING_CAPTION: &str = "儲存中...";
pub const FORM_LOADING: &str = "載入資料中...";
pub const EDIT_LOAD_FAILED: &str = "載入編輯資料失敗，請稍後再試。";
pub const SAVE_FAILED: &str = "處理請求時發生未預期的錯誤。";
pub const DELETE_CONFIRM: &str = "確定要刪除這筆資料嗎？";
pub const DELETE_FAILED: &str = "刪除失敗，請重新整理頁面再試。";

// District selector
pub const DISTRICT_PLACEHOLDER: &str = "請選擇行政區";
pub const DISTRICT_LOADING: &str = "載入中...";
pub const DISTRICT_NONE: &str = "無可選行政區";
pub const DISTRICT_FAILED: &str = "載入失敗";
pub const DISTRICT_URL_MISSING: &str = "載入失敗 (URL錯誤)";

// Estimate flow
pub const ESTIMATE_CAPTION: &str = "開始估價";
pub const ESTIMATE_BUSY_CAPTION: &str = "後台運算中...";
pub const ESTIMATE_INVALID: &str = "輸入資料有誤，請檢查後重試。";
pub const ESTIMATE_CONNECTION_FAILED: &str = "連線發生錯誤，請稍後再試";
pub const ESTIMATE_LOCATE_FAILED: &str = "無法定位該地址，請檢查輸入是否正確。";
pub const ESTIMATE_REJECTED_PREFIX: &str = "估價失敗：";
pub const ESTIMATE_REJECTED_DEFAULT: &str = "輸入資料有誤，請檢查欄位。";

// Client-side constraint violations
pub const FIELD_REQUIRED: &str = "此欄位為必填";
pub const FIELD_TYPE_MISMATCH: &str = "格式不正確";
pub const FIELD_STEP_MISMATCH: &str = "數值間隔不符";

pub fn field_range_underflow(min: &str) -> String {
    format!("數值不能小於 {min}")
}

pub fn field_range_overflow(max: &str) -> String {
    format!("數值不能大於 {max}")
}

pub fn field_too_short(min_length: i32) -> String {
    format!("內容太短 (最少 {min_length} 字)")
}

pub fn field_too_long(max_length: i32) -> String {
    format!("內容太長 (最多 {max_length} 字)")
}

// Notifications
pub const TOAST_REFRESH: &str = "點擊更新";

pub fn toast_heading(label: &str) -> String {
    format!("【{label}系統通知】")
}

// Map
pub const MAP_TARGET_TITLE: &str = "目標估價房屋";
pub const MAP_PREDICTED_PRICE: &str = "預測價格";
pub const MAP_UNKNOWN_PRICE: &str = "(未知)";
pub const MAP_UNKNOWN_ADDRESS: &str = "未知地址";
pub const MAP_PRICE: &str = "成交價";
pub const MAP_AREA: &str = "坪數";
pub const MAP_TYPE: &str = "類型";
pub const MAP_AGE: &str = "屋齡";
pub const MAP_DISTANCE: &str = "距離";
pub const UNIT_TEN_THOUSAND: &str = "萬元";
pub const UNIT_PING: &str = "坪";
pub const UNIT_YEARS: &str = "年";
pub const NOT_AVAILABLE: &str = "N/A";
