// ============================================================
// CANNED OCR BACKEND ROUTES
// ============================================================
// One route per backend endpoint; the three `/process` variants are
// told apart by query string and body content

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Match rule applied to the raw request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyRule {
    pub mode: MatchMode,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    Contains,
    Regex,
}

/// Required query parameter; an empty value accepts any value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRule {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl CannedResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay_ms: None,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }).to_string(),
            delay_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRoute {
    pub name: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: Vec<QueryRule>,
    #[serde(default)]
    pub body: Option<BodyRule>,
    pub response: CannedResponse,
}

impl MockRoute {
    fn post(name: &str, path: &str, response: CannedResponse) -> Self {
        Self {
            name: name.to_string(),
            method: "POST".to_string(),
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            response,
        }
    }

    fn with_query(mut self, key: &str) -> Self {
        self.query.push(QueryRule {
            key: key.to_string(),
            value: String::new(),
        });
        self
    }

    fn with_body(mut self, mode: MatchMode, value: &str) -> Self {
        self.body = Some(BodyRule {
            mode,
            value: value.to_string(),
        });
        self
    }
}

/// Routes answering every call the screens make with plausible data
pub fn default_routes() -> Vec<MockRoute> {
    vec![
        MockRoute::post(
            "quick process",
            "/process_file",
            CannedResponse::ok(json!({
                "message": "File processed successfully",
                "text": "Employee Name: Alice Smith\nBasic Salary: 1000\nNet Pay: 1200"
            })),
        ),
        MockRoute::post(
            "upload",
            "/api/upload",
            CannedResponse::ok(json!({
                "message": "File uploaded successfully",
                "file_url": "https://storage.mock/uploads/slip.png"
            })),
        ),
        MockRoute::post(
            "crop process",
            "/process",
            CannedResponse::ok(json!({
                "message": "Processing complete",
                "results_csv_url": "https://storage.mock/results/ocr_results.csv",
                "tesseract_image_urls": ["https://storage.mock/crops/tesseract_0.png"],
                "easyocr_image_urls": ["https://storage.mock/crops/easyocr_0.png"],
                "ocr_results": [
                    {"Recognized Text": "Basic", "Confidence Score": 96, "OCR Model": "Tesseract"},
                    {"Recognized Text": "1,000.00", "Confidence Score": 91.5, "OCR Model": "EasyOCR"}
                ]
            })),
        )
        .with_body(MatchMode::Contains, "\"file_url\""),
        MockRoute::post(
            "slip extraction",
            "/process",
            CannedResponse::ok(json!({
                "extracted_data": {
                    "slip_1.png": {"Employee Name": "Alice Smith", "Basic Salary": 1000, "Net Pay": 1200},
                    "slip_2.png": {"Employee Name": "Bob Jones", "Basic Salary": 900, "Bonus": 50}
                },
                "pie_chart_files": ["https://storage.mock/charts/pie_0.png"],
                "bar_chart_files": ["https://storage.mock/charts/bar_0.png"]
            })),
        )
        .with_query("input_type"),
        MockRoute::post(
            "cloud batch without images",
            "/process",
            CannedResponse::error(400, "num_images must be at least 1"),
        )
        .with_body(MatchMode::Regex, r#""num_images"\s*:\s*0\b"#),
        MockRoute::post(
            "cloud batch",
            "/process",
            CannedResponse::ok(json!({
                "extracted_data": {
                    "img_001.png": "Account Holder: Alice Smith\nClosing Balance: 5,400.00\nnot a pair",
                    "img_002.png": "Account Holder: Bob Jones\nClosing Balance:\nBranch: Central"
                },
                "pie_chart_files": [],
                "bar_chart_files": []
            })),
        )
        .with_body(MatchMode::Contains, "\"folder_name\""),
    ]
}
