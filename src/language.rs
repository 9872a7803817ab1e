use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages a screenshot can be named in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum TargetLanguage {
    #[serde(rename = "zh-hans")]
    #[value(name = "zh-hans")]
    SimplifiedChinese,
    #[serde(rename = "zh-hant")]
    #[value(name = "zh-hant")]
    TraditionalChinese,
    #[serde(rename = "en")]
    #[value(name = "en")]
    English,
    #[serde(rename = "jp")]
    #[value(name = "jp")]
    Japanese,
}

/// Stage-1 prompt used by two-stage providers. Always answered in English.
pub const CONTENT_CATEGORY_PROMPT: &str = "What is the main content of this screenshot? \
Answer with a short, generic category phrase of 2 to 5 English words, \
for example: code editor, web browser, chat conversation, spreadsheet. \
Do not write a sentence. If you cannot tell, answer only: skip";

impl TargetLanguage {
    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::SimplifiedChinese => "zh-hans",
            TargetLanguage::TraditionalChinese => "zh-hant",
            TargetLanguage::English => "en",
            TargetLanguage::Japanese => "jp",
        }
    }

    /// Chinese and Japanese names are counted in characters, not words
    pub fn is_cjk(&self) -> bool {
        !matches!(self, TargetLanguage::English)
    }

    /// Prompt for single-stage providers: the image goes alongside this text
    /// and the answer is already in the target language.
    pub fn describe_prompt(&self) -> &'static str {
        match self {
            TargetLanguage::SimplifiedChinese => "请用简洁中文描述这张图片的主要内容，不要超过10个字",
            TargetLanguage::TraditionalChinese => "請用簡潔繁體中文描述這張圖片的主要內容，不要超過10個字",
            TargetLanguage::English => {
                "Describe the main content of this image in brief English within 10 words"
            }
            TargetLanguage::Japanese => "画像の主要内容を10字以内の簡潔な日本語で説明してください",
        }
    }

    /// Prompt for the second stage of a two-stage provider, compressing a
    /// stage-1 phrase into a filename-sized label.
    pub fn condense_prompt(&self, phrase: &str) -> String {
        let language = match self {
            TargetLanguage::SimplifiedChinese => "Simplified Chinese",
            TargetLanguage::TraditionalChinese => "Traditional Chinese",
            TargetLanguage::English => "English",
            TargetLanguage::Japanese => "Japanese",
        };
        let constraint = if self.is_cjk() {
            "exactly 2 to 4 characters"
        } else {
            "exactly 2 to 3 English words"
        };

        format!(
            "Turn the following description into a file name label in {language}.\n\
             Description: {phrase}\n\
             Rules:\n\
             - Use {constraint}.\n\
             - No sentences, no articles, no punctuation, no explanation.\n\
             - Reply with the label only.\n\
             - If it cannot be done, reply only: skip"
        )
    }
}

impl Default for TargetLanguage {
    fn default() -> Self {
        TargetLanguage::English
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
