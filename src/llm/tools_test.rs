use super::*;

#[test]
fn garden_tools_names() {
    let tools = garden_tools();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec![ADD_PLANTS, REMOVE_PLANTS, REMOVE_BED]);
}

#[test]
fn schema_shape_is_object() {
    for tool in &garden_tools() {
        assert_eq!(
            tool.input_schema.get("type").and_then(|v| v.as_str()),
            Some("object"),
            "tool {} schema should be type=object",
            tool.name
        );
    }
}

#[test]
fn every_tool_requires_bed_name_and_response() {
    for tool in &garden_tools() {
        let required: Vec<&str> = tool.input_schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"bedName"), "tool {} should require bedName", tool.name);
        assert!(required.contains(&"response"), "tool {} should require response", tool.name);
    }
}

#[test]
fn add_plants_items_require_common_name() {
    let tools = garden_tools();
    let add = tools.iter().find(|t| t.name == ADD_PLANTS).unwrap();
    let items = &add.input_schema["properties"]["plants"]["items"];
    assert_eq!(items["required"], serde_json::json!(["commonName"]));
    assert_eq!(items["properties"]["quantity"]["type"], "integer");
}

#[test]
fn schemas_avoid_formats_gemini_rejects() {
    for tool in &garden_tools() {
        let text = tool.input_schema.to_string();
        assert!(!text.contains("\"format\""), "tool {} should not declare string formats", tool.name);
    }
}
