//! Prompt assembly for the combined data/code extraction call.

use crate::rank::RankedContext;

pub const SYSTEM_PROMPT: &str = "You extract data and code availability statements from \
scientific papers. You are given numbered candidate passages. Answer with strict JSON only, \
no prose, using exactly this schema:\n\
{\"data\":{\"verdict\":\"present\"|\"absent\",\"raw_quote\":string,\"clean_statement\":string,\
\"links\":[string],\"confidence\":number},\
\"code\":{\"verdict\":\"present\"|\"absent\",\"raw_quote\":string,\"clean_statement\":string,\
\"links\":[string],\"confidence\":number}}\n\
raw_quote must be copied verbatim from one passage. Never invent text or links. \
If no statement exists for a side, use verdict \"absent\" with empty fields.";

/// Render the numbered DATA/CODE context blocks for the user message.
pub fn build_user_prompt(data: &[RankedContext], code: &[RankedContext]) -> String {
    let mut out = String::from(
        "Find the data availability statement and the code availability statement \
         in the passages below.\n",
    );
    for (i, ctx) in data.iter().enumerate() {
        out.push_str(&format!("\n[DATA #{}]\n{}\n", i + 1, ctx.text));
    }
    if data.is_empty() {
        out.push_str("\n[DATA] no candidate passages\n");
    }
    for (i, ctx) in code.iter().enumerate() {
        out.push_str(&format!("\n[CODE #{}]\n{}\n", i + 1, ctx.text));
    }
    if code.is_empty() {
        out.push_str("\n[CODE] no candidate passages\n");
    }
    out
}
