#[test]
fn renderer_wgsl_sources_parse_successfully() {
    parse_wgsl("tile_quad.wgsl", crate::TILE_QUAD_WGSL);
}

fn parse_wgsl(label: &str, source: &str) {
    naga::front::wgsl::parse_str(source).unwrap_or_else(|error| {
        panic!(
            "WGSL parse failed for {label}: {}",
            error.emit_to_string(source)
        )
    });
}
