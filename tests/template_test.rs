use kiln::constants::MAX_PARTIAL_DEPTH;
use kiln::template::{
    clear_template_cache, load_template, TemplateEngine, TemplateRenderer, DEFAULT_TEMPLATE,
};
use serde_json::json;
use tempfile::TempDir;

fn render(template: &str, context: serde_json::Value) -> String {
    TemplateEngine::new().render(template, &context)
}

#[test]
fn test_variables() {
    let ctx = json!({"name": "demo", "deps": {"production": ["a", "b"]}, "n": 3});
    assert_eq!(render("# {{name}}", ctx.clone()), "# demo");
    assert_eq!(render("{{ name }}/{{n}}", ctx.clone()), "demo/3");
    assert_eq!(render("{{deps.production}}", ctx.clone()), "a, b");
    assert_eq!(render("{{deps.production.1}}", ctx.clone()), "b");
    assert_eq!(render("Hi {{nobody}}!", ctx), "Hi !");
}

#[test]
fn test_nested_conditionals() {
    let template = "{{#if a}}{{#if b}}X{{else}}Y{{/if}}{{else}}Z{{/if}}";
    assert_eq!(render(template, json!({"a": true, "b": false})), "Y");
    assert_eq!(render(template, json!({"a": true, "b": true})), "X");
    assert_eq!(render(template, json!({"a": false, "b": true})), "Z");
}

#[test]
fn test_conditional_truthiness() {
    let template = "{{#if items}}some{{else}}none{{/if}}";
    assert_eq!(render(template, json!({"items": []})), "none");
    assert_eq!(render(template, json!({"items": [1]})), "some");
    assert_eq!(render(template, json!({"items": ""})), "none");
    assert_eq!(render(template, json!({})), "none");
    assert_eq!(render("{{#if flag}}on{{/if}}", json!({"flag": false})), "");
}

#[test]
fn test_each_block() {
    let ctx = json!({"items": ["x", "y"]});
    assert_eq!(render("{{#each items}}{{this}}-{{@index}} {{/each}}", ctx), "x-0 y-1 ");
}

#[test]
fn test_each_block_object_fields_and_position() {
    let ctx = json!({"people": [{"name": "a"}, {"name": "b"}]});
    let template = "{{#each people}}{{name}}{{#if @last}}.{{else}}, {{/if}}{{/each}}";
    assert_eq!(render(template, ctx), "a, b.");
}

#[test]
fn test_each_block_keeps_outer_scope() {
    let ctx = json!({"prefix": "-", "items": ["x", "y"]});
    assert_eq!(render("{{#each items}}{{prefix}}{{this}}{{/each}}", ctx), "-x-y");
}

#[test]
fn test_each_block_degrades() {
    assert_eq!(render("[{{#each name}}x{{/each}}]", json!({"name": "scalar"})), "[]");
    assert_eq!(render("[{{#each missing}}x{{/each}}]", json!({})), "[]");
    assert_eq!(render("{{#each items}}x", json!({"items": [1]})), "{{#each items}}x");
}

#[test]
fn test_conditional_inside_each_sees_element() {
    let ctx = json!({"items": [{"name": "a", "on": true}, {"name": "b", "on": false}]});
    let template = "{{#each items}}{{#if on}}[{{name}}]{{/if}}{{/each}}";
    assert_eq!(render(template, ctx), "[a]");
}

#[test]
fn test_each_inside_conditional() {
    let ctx = json!({"show": true, "items": ["x", "y"]});
    let template = "{{#if show}}{{#each items}}<{{this}}>{{/each}}{{else}}hidden{{/if}}";
    assert_eq!(render(template, ctx), "<x><y>");
}

#[test]
fn test_builtin_helpers() {
    let ctx = json!({"tags": ["go", "rust"], "name": "Kiln", "flag": true});
    assert_eq!(render(r#"{{join tags ", "}}"#, ctx.clone()), "go, rust");
    assert_eq!(render("{{join tags}}", ctx.clone()), "go,rust");
    assert_eq!(render("{{uppercase name}}", ctx.clone()), "KILN");
    assert_eq!(render("{{lowercase name}}", ctx.clone()), "kiln");
    assert_eq!(render("{{if flag}}|{{unless flag}}", ctx.clone()), "true|");
    assert_eq!(render(r#"{{each tags "<{{this}}>"}}"#, ctx), "<go><rust>");
}

#[test]
fn test_unknown_helper_stays_literal() {
    let ctx = json!({"name": "x"});
    assert_eq!(render("{{shout name}}", ctx), "{{shout name}}");
}

#[test]
fn test_stray_block_tags_stay_literal() {
    assert_eq!(render("a {{else}} b", json!({"else": "x"})), "a {{else}} b");
    assert_eq!(render("a {{/if}} b", json!({})), "a {{/if}} b");
}

#[test]
fn test_context_values_are_not_markup() {
    let ctx = json!({"d": "{{uppercase d}}", "flag": true, "tags": ["{{d}}"]});
    assert_eq!(render("{{d}}", ctx.clone()), "{{uppercase d}}");
    assert_eq!(render("{{#if flag}}<{{d}}>{{/if}}", ctx.clone()), "<{{uppercase d}}>");
    assert_eq!(render("{{#each tags}}{{this}}{{/each}}", ctx.clone()), "{{d}}");
    assert_eq!(render("{{join tags}}", ctx), "{{d}}");
}

#[test]
fn test_registered_helper() {
    let mut engine = TemplateEngine::new();
    engine.register_helper("shout", |args| {
        format!("{}!", args.first().and_then(|v| v.as_str()).unwrap_or_default().to_uppercase())
    });
    assert!(engine.has_helper("shout"));
    assert_eq!(engine.render("{{shout name}}", &json!({"name": "hey"})), "HEY!");
}

#[test]
fn test_partials() {
    let mut engine = TemplateEngine::new();
    engine.register_partial("greeting", "Hello {{name}}{{#if excited}}!{{/if}}");

    let ctx = json!({"name": "kiln", "excited": true});
    assert_eq!(engine.render("{{> greeting}}", &ctx), "Hello kiln!");
    assert_eq!(engine.render("{{> missing}}", &ctx), "{{> missing}}");
}

#[test]
fn test_recursive_partial_is_bounded() {
    let mut engine = TemplateEngine::new();
    engine.register_partial("loop", "x{{> loop}}");

    let out = engine.render("{{> loop}}", &json!({}));
    assert_eq!(out, format!("{}{{{{> loop}}}}", "x".repeat(MAX_PARTIAL_DEPTH)));
}

#[test]
fn test_rendering_is_deterministic_and_idempotent() {
    let engine = TemplateEngine::with_default_partials();
    let ctx = json!({
        "projectName": "demo",
        "projectType": "web",
        "languageLabel": "TypeScript",
        "fileStructure": "demo/",
        "testingStrategy": "Write tests.",
        "commandList": [{"name": "dev", "command": "npm run dev"}],
    });

    let first = engine.render(DEFAULT_TEMPLATE, &ctx);
    let second = engine.render(DEFAULT_TEMPLATE, &ctx);
    assert_eq!(first, second);
    assert!(first.starts_with("# demo\n"));
    assert!(first.contains("| dev | `npm run dev` |"));

    let plain = "No markers here.\nJust { single } braces.";
    assert_eq!(engine.render(plain, &ctx), plain);
}

#[test]
fn test_register_partials_from_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("sections")).unwrap();
    std::fs::write(dir.path().join("header.md"), "# {{title}}").unwrap();
    std::fs::write(dir.path().join("sections/intro.hbs"), "Intro for {{title}}").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut engine = TemplateEngine::new();
    let count = engine.register_partials_from_dir(dir.path()).unwrap();

    assert_eq!(count, 2);
    assert!(engine.has_partial("header"));
    assert!(engine.has_partial("sections/intro"));
    assert!(!engine.has_partial("notes"));

    let out = engine.render("{{> header}}\n{{> sections/intro}}", &json!({"title": "T"}));
    assert_eq!(out, "# T\nIntro for T");
}

#[test]
fn test_template_cache_until_cleared() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("setup.md");
    std::fs::write(&path, "v1 {{name}}").unwrap();

    let engine = TemplateEngine::new();
    let ctx = json!({"name": "x"});
    assert_eq!(engine.render_file(&path, &ctx).unwrap(), "v1 x");

    std::fs::write(&path, "v2 {{name}}").unwrap();
    assert_eq!(engine.render_file(&path, &ctx).unwrap(), "v1 x");

    clear_template_cache();
    assert_eq!(engine.render_file(&path, &ctx).unwrap(), "v2 x");
}

#[test]
fn test_load_missing_template() {
    let dir = TempDir::new().unwrap();
    assert!(load_template(dir.path().join("absent.md")).is_err());
    assert!(load_template(dir.path()).is_err());
}
