use std::sync::Arc;
use std::thread;

use indoc::indoc;
use lsp_types::{InsertTextFormat, Position};

use phel_completion::config::CompletionConfig;
use phel_completion::lsp::features::completion::{
    Candidate, CompletionCache, CompletionEngine, InsertionBehavior, Priority, completion_items,
};
use phel_completion::workspace::{InMemoryProject, WorkspaceDirectory};
use test_utils::fixtures::{TempProject, cursor_fixture};

fn complete(engine: &CompletionEngine, fixture: &str) -> Vec<Candidate> {
    let (source, offset) = cursor_fixture(fixture);
    engine
        .complete_source(&source, offset)
        .expect("cursor is inside the document")
}

fn texts(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.text.as_str()).collect()
}

fn position_of(candidates: &[Candidate], text: &str) -> usize {
    candidates
        .iter()
        .position(|c| c.text == text)
        .unwrap_or_else(|| panic!("{text} missing from {:?}", texts(candidates)))
}

#[test]
fn test_file_scope_offers_only_new_form_affordances() {
    let engine = CompletionEngine::default();
    let candidates = complete(
        &engine,
        indoc! {r#"
            (ns app\main)

            (defn greet [name] (str "hi " name))

            ¦
        "#},
    );
    assert_eq!(candidates[0].insertion, InsertionBehavior::BalancedParens);
    assert!(
        candidates[1..]
            .iter()
            .all(|c| matches!(c.insertion, InsertionBehavior::Template(_)))
    );
    assert!(!texts(&candidates).contains(&"greet"));
}

#[test]
fn test_definition_name_suggests_no_existing_function() {
    let engine = CompletionEngine::default();
    let candidates = complete(
        &engine,
        indoc! {"
            (defn parse [s] s)
            (defn render [x] x)
            (defn ¦"},
    );
    assert!(candidates.iter().all(Candidate::is_informational));
    for existing in ["parse", "render", "map", "filter"] {
        assert!(!texts(&candidates).contains(&existing));
    }
}

#[test]
fn test_filter_ranks_predicates_above_generic_api() {
    let engine = CompletionEngine::default();
    let candidates = complete(&engine, "(filter ¦)");
    assert!(position_of(&candidates, "nil?") < position_of(&candidates, "first"));
    assert!(position_of(&candidates, "even?") < position_of(&candidates, "count"));
    let even = &candidates[position_of(&candidates, "even?")];
    assert!(even.priority < Priority::CommonBuiltins);
}

#[test]
fn test_parameter_vector_slot_offers_bracket_only() {
    let engine = CompletionEngine::default();
    let candidates = complete(&engine, "(defn area ¦)");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].insertion, InsertionBehavior::BalancedBrackets);
}

#[test]
fn test_inside_parameter_vector_offers_names() {
    let engine = CompletionEngine::default();
    let candidates = complete(&engine, "(defn area [¦");
    // The vector is still open, so closing it comes first.
    assert_eq!(candidates[0].text, "]");
    assert!(texts(&candidates).len() > 1);
    assert!(!texts(&candidates).contains(&"map"));
}

#[test]
fn test_body_sees_parameters_and_let_bindings() {
    let engine = CompletionEngine::default();
    let candidates = complete(
        &engine,
        indoc! {"
            (defn total-price [items tax]
              (let [subtotal (reduce + items)
                    rate (inc tax)]
                (* ¦)))"},
    );
    let named: Vec<&Candidate> = candidates.iter().filter(|c| !c.is_informational()).collect();
    let first: Vec<&str> = named.iter().take(4).map(|c| c.text.as_str()).collect();
    assert_eq!(first, vec!["subtotal", "rate", "items", "tax"]);
    assert_eq!(named[0].type_hint.as_deref(), Some("Let Binding"));
    assert_eq!(named[2].type_hint.as_deref(), Some("Parameter"));
}

#[test]
fn test_recursive_reference_is_tagged() {
    let engine = CompletionEngine::default();
    let candidates = complete(&engine, "(defn fact [n] (if (zero? n) 1 (* n (fa¦))))");
    let fact = &candidates[position_of(&candidates, "fact")];
    assert_eq!(fact.priority, Priority::CurrentFunctionRecursive);
    assert_eq!(fact.type_hint.as_deref(), Some("Recursive Function"));
}

#[test]
fn test_argument_hint_uses_project_signature() {
    let project = InMemoryProject::new()
        .with_file("src/geometry.phel", "(ns app\\geometry)\n(defn scale [shape factor] shape)");
    let engine = CompletionEngine::default().with_project(Arc::new(project));
    let candidates = complete(&engine, "(scale square ¦)");
    assert_eq!(candidates[0].display_text, "factor (argument 2 of scale)");
    assert!(candidates[0].is_informational());
}

#[test]
fn test_project_on_disk() -> anyhow::Result<()> {
    let project = TempProject::new(&[
        (
            "src/app/utils.phel",
            "(ns app\\utils)\n(defn slugify [s] s)\n(defn- hidden [] 1)",
        ),
        ("src/app/main.phel", "(ns app\\main)\n(defn only-in-main [] 1)"),
        ("vendor/lib/skip.phel", "(ns vendor\\skip)\n(defn vendored [] 1)"),
    ])?;
    let engine = CompletionEngine::default()
        .with_project(Arc::new(WorkspaceDirectory::new(project.root())?));

    let candidates = complete(&engine, "(defn run [] (¦))");
    let found = texts(&candidates);
    assert!(found.contains(&"slugify"));
    assert!(found.contains(&"only-in-main"));
    assert!(!found.contains(&"hidden"));
    assert!(!found.contains(&"vendored"));

    let slugify = &candidates[position_of(&candidates, "slugify")];
    assert_eq!(slugify.type_hint.as_deref(), Some("Public Function (utils)"));

    // The file being edited is left out of the project scan.
    let main = project.path("src/app/main.phel");
    let (source, offset) = cursor_fixture("(defn run [] (only¦))");
    let candidates = engine.complete_source_in(&source, offset, Some(&main))?;
    assert!(!texts(&candidates).contains(&"only-in-main"));
    Ok(())
}

#[test]
fn test_namespace_require_offers_project_namespaces() {
    let project = InMemoryProject::new()
        .with_file("src/db.phel", "(ns app\\db)")
        .with_file("src/http.phel", "(ns app\\http)");
    let engine = CompletionEngine::default().with_project(Arc::new(project));

    let candidates = complete(&engine, "(ns app\\main\n  (:require app\\¦))");
    assert_eq!(texts(&candidates), vec!["app\\db", "app\\http"]);

    let candidates = complete(&engine, "(ns app\\main\n  (:require phel\\str ¦))");
    assert_eq!(texts(&candidates), vec![":as", ":refer []"]);

    let candidates = complete(&engine, "(ns app\\main ¦)");
    assert_eq!(candidates.len(), 3);
}

#[test]
fn test_keywords_from_file_are_offered() {
    let engine = CompletionEngine::default();
    let candidates = complete(
        &engine,
        indoc! {"
            (def user {:name \"Ada\" :email \"ada@example.org\"})
            (get user :na¦)"},
    );
    assert_eq!(candidates[0].text, ":name");
    assert!(!texts(&candidates).contains(&":email"));
}

#[test]
fn test_nothing_inside_comments() {
    let engine = CompletionEngine::default();
    assert!(complete(&engine, "; (map ¦\n(def x 1)").is_empty());
}

#[test]
fn test_usage_counts_survive_cache_clear() {
    let engine = CompletionEngine::default();
    assert_eq!(engine.record_usage("filter"), 1);
    let candidates = complete(&engine, "(filt¦)");
    let filter = &candidates[position_of(&candidates, "filter")];
    assert!(filter.type_hint.as_deref().is_some_and(|hint| hint.ends_with("(used 1x)")));

    engine.clear_caches();
    assert!(engine.cache().is_empty());
    assert_eq!(engine.cache().usage_count("filter"), 1);
}

#[test]
fn test_shared_cache_across_engines() {
    let cache = Arc::new(CompletionCache::new(100));
    let first = CompletionEngine::default().with_cache(Arc::clone(&cache));
    let second = CompletionEngine::default().with_cache(Arc::clone(&cache));
    first.record_usage("map");
    assert_eq!(second.cache().usage_count("map"), 1);

    complete(&first, "(map ¦)");
    let stats = cache.stats();
    assert!(stats.size > 0);
    assert_eq!(stats.capacity, 100);
}

#[test]
fn test_concurrent_requests_agree() {
    let engine = Arc::new(CompletionEngine::default());
    let expected: Vec<String> = complete(&engine, "(filter ¦ xs)")
        .into_iter()
        .map(|c| c.display_text)
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                complete(&engine, "(filter ¦ xs)")
                    .into_iter()
                    .map(|c| c.display_text)
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("worker panicked"), expected);
    }
}

#[test]
fn test_lsp_items_preserve_order() {
    let engine = CompletionEngine::default();
    let text = "(ns app)\n\n(defn area ";
    let items = engine
        .complete_at(text, Position { line: 2, character: 11 })
        .expect("position is inside the document");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "[]");
    assert_eq!(items[0].insert_text.as_deref(), Some("[$0]"));
    assert_eq!(items[0].insert_text_format, Some(InsertTextFormat::SNIPPET));

    let candidates = complete(&engine, "(map ¦)");
    let items = completion_items(&candidates);
    assert_eq!(items.len(), candidates.len());
    let sort_texts: Vec<&str> = items.iter().filter_map(|i| i.sort_text.as_deref()).collect();
    let mut sorted = sort_texts.clone();
    sorted.sort();
    assert_eq!(sort_texts, sorted);
}

#[test]
fn test_config_limits_results() {
    let config = CompletionConfig::from_json_str(r#"{"max_results": 3}"#).expect("valid config");
    let engine = CompletionEngine::new(config);
    assert_eq!(complete(&engine, "(let [a 1] ¦)").len(), 3);
}
