use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Structured business fields pulled out of an intake transcript.
///
/// The aliases are the labels printed on the city's fillable PDF forms; models
/// asked for JSON matching those forms tend to echo them back as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDetails {
    #[serde(default, alias = "(Business Owner)")]
    pub business_owner_name: String,
    #[serde(default, alias = "(Business Owner Phone)", alias = "(Owner Phone)")]
    pub business_owner_phone: String,
    #[serde(default, alias = "(Name of Business DBA)")]
    pub business_name_dba: String,
    #[serde(default, alias = "(Business Phone)")]
    pub business_phone: String,
    #[serde(
        default,
        alias = "(Business Address include street directions and suite number if applicable)"
    )]
    pub business_address: String,
    #[serde(default, alias = "(City)")]
    pub city: String,
    #[serde(default, alias = "(Zip)")]
    pub zip_code: String,
}

/// Field names on the city's fillable application PDFs.
const PDF_BUSINESS_ADDRESS: &str = "Business Address include street directions and suite number if applicable";

impl BusinessDetails {
    /// Pairs of PDF field name and value for every non-empty field.
    pub fn pdf_field_values(&self) -> Vec<(&'static str, &str)> {
        [
            ("Business Owner", &self.business_owner_name),
            ("Owner Phone", &self.business_owner_phone),
            ("Name of Business DBA", &self.business_name_dba),
            ("Business Phone", &self.business_phone),
            (PDF_BUSINESS_ADDRESS, &self.business_address),
            ("City", &self.city),
            ("Zip", &self.zip_code),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(name, value)| (name, value.as_str()))
        .collect()
    }

    /// JSON schema handed to the model as the required response shape.
    pub fn json_schema() -> Value {
        let field = |description: &str| json!({ "type": "string", "description": description });
        json!({
            "title": "BusinessDetails",
            "description": "Only extract the core info, don't give any additional info",
            "type": "object",
            "properties": {
                "business_owner_name": field("Name of business owner"),
                "business_owner_phone": field("Phone number of business owner"),
                "business_name_dba": field("Name of Business DBA"),
                "business_phone": field("Business phone number"),
                "business_address": field("Business address including street directions and suite number if applicable"),
                "city": field("City where business is located"),
                "zip_code": field("ZIP code of business location")
            },
            "required": [
                "business_owner_name",
                "business_owner_phone",
                "business_name_dba",
                "business_phone",
                "business_address",
                "city",
                "zip_code"
            ]
        })
    }
}
