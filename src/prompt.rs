//! Request construction for the generation capabilities.
//!
//! The wording here is not a contract; only the part order is. A sheet
//! request is always: source photo, optional style reference, one text
//! instruction.

use crate::capability::Part;
use crate::types::{Angle, GenerationInputs};

/// Ordered parts for one four-view sheet request.
pub fn sheet_request(inputs: &GenerationInputs) -> Vec<Part> {
    let mut parts = vec![Part::Image(inputs.source_image.clone())];
    let reference = inputs
        .style_reference
        .as_ref()
        .filter(|r| !r.bytes.is_empty());
    if let Some(reference) = reference {
        parts.push(Part::Image(reference.clone()));
    }
    parts.push(Part::Text(sheet_instruction(inputs, reference.is_some())));
    parts
}

fn sheet_instruction(inputs: &GenerationInputs, has_reference: bool) -> String {
    let mut style = Vec::new();
    if let Some(description) = inputs.description() {
        style.push(format!("Hairstyle: {description}."));
    }
    if has_reference {
        style.push(
            "Copy the hairstyle from the second image (the style reference) onto the person in the first image."
                .to_string(),
        );
    }
    if let Some(color) = inputs.hair_color() {
        style.push(format!("Hair colour: {color}."));
    }
    if let Some(modification) = inputs.modification() {
        style.push(format!("Adjustment: {modification}."));
    }

    let grid = Angle::ALL
        .iter()
        .map(|angle| format!("{} view in the {} cell", angle.label(), cell_name(*angle)))
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "Restyle the hair of the person in the first image. Keep their face, identity, skin tone and clothing unchanged. {}\n\n\
         Output a single image arranged as a 2x2 grid of four equal cells showing the same person with the new hairstyle: {grid}. \
         Use a plain neutral background, consistent lighting in every cell, and no borders, labels or text.",
        style.join(" ")
    )
}

fn cell_name(angle: Angle) -> &'static str {
    match angle.grid_position() {
        (0, 0) => "top-left",
        (1, 0) => "top-right",
        (0, _) => "bottom-left",
        _ => "bottom-right",
    }
}

/// Text description a video can be generated from, if the inputs allow one.
///
/// Falls back from the written description to the reference image to the
/// hair colour alone.
pub fn video_description(inputs: &GenerationInputs) -> Option<String> {
    let base = if let Some(description) = inputs.description() {
        description.to_string()
    } else if inputs
        .style_reference
        .as_ref()
        .is_some_and(|r| !r.bytes.is_empty())
    {
        "the hairstyle from the reference photo".to_string()
    } else {
        format!("{} hair", inputs.hair_color()?)
    };

    Some(match inputs.modification() {
        Some(modification) => format!("{base}, {modification}"),
        None => base,
    })
}

/// Prompt for the turntable video seeded with the front view.
pub fn video_prompt(description: &str) -> String {
    format!(
        "A slow 360-degree turntable shot of this person showing off their new hairstyle ({}). \
         The camera stays at head height while they turn; the hair moves naturally. Studio lighting, plain background.",
        description.trim()
    )
}
