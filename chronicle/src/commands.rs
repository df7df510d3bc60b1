//! Shell commands over a [`Store`].
//!
//! Every command produces plain output lines so the same code serves the
//! interactive shell, one-shot invocations and tests.

use crate::forms::{self, Fields};
use anyhow::{anyhow, bail, Context, Result};
use chronicle_core::{
    Campaign, Character, CollectionName, EntityId, EntityRef, Item, Location, Note, Record,
    Relationship, Store, Stored,
};

/// Default number of activity entries shown by `recent`.
const RECENT_LIMIT: usize = 6;

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Campaigns,
    Use(Option<EntityId>),
    List {
        collection: CollectionName,
        search: String,
        kind: String,
    },
    Tree {
        search: String,
    },
    Show(EntityId),
    Add {
        collection: CollectionName,
        fields: Fields,
    },
    Edit {
        id: EntityId,
        fields: Fields,
    },
    Remove(EntityId),
    Stats,
    Recent(usize),
    Types,
    Links(String),
    Export,
    Quit,
}

impl Command {
    /// Whether the command writes to storage.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Use(_) | Command::Add { .. } | Command::Edit { .. } | Command::Remove(_)
        )
    }
}

pub const HELP: &[&str] = &[
    "Commands:",
    "  campaigns                      - List campaigns (* marks the current one)",
    "  use <campaign-id|none>         - Switch campaign",
    "  list <collection> [search=..] [type=..]",
    "                                 - List records in the current campaign",
    "  tree [search]                  - Show the location hierarchy",
    "  show <id>                      - Show one record",
    "  add <collection> [name] key=value ...",
    "                                 - Create a record",
    "  edit <id> key=value ...        - Update a record (empty value clears a link)",
    "  rm <id>                        - Delete a record and what depends on it",
    "  stats                          - Record counts for the current campaign",
    "  recent [n]                     - Latest notes and characters",
    "  types                          - Relationship types",
    "  links <text>                   - Names recognised in a piece of text",
    "  export                         - Print the whole document as JSON",
    "  quit                           - Exit",
];

/// Split a line into words, honouring single and double quotes.
///
/// Quotes may open mid-word, so `name="Tresendar Manor"` is one token.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("unclosed {q} quote");
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn collection_arg(word: Option<&String>, usage: &str) -> Result<CollectionName> {
    let word = word.ok_or_else(|| anyhow!("Usage: {usage}"))?;
    word.parse::<CollectionName>().map_err(|e| anyhow!(e))
}

fn id_arg(word: Option<&String>, usage: &str) -> Result<EntityId> {
    word.map(|w| EntityId::from(w.as_str()))
        .ok_or_else(|| anyhow!("Usage: {usage}"))
}

/// Parse already-split words. A leading `#` on the verb is accepted.
pub fn parse(words: &[String]) -> Result<Command> {
    let Some((verb, args)) = words.split_first() else {
        bail!("empty command");
    };

    let command = match verb.trim_start_matches('#').to_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "campaigns" => Command::Campaigns,
        "use" => {
            let id = id_arg(args.first(), "use <campaign-id|none>")?;
            if id.as_str().eq_ignore_ascii_case("none") {
                Command::Use(None)
            } else {
                Command::Use(Some(id))
            }
        }
        "list" | "ls" => {
            let collection = collection_arg(args.first(), "list <collection>")?;
            let fields = Fields::parse(&args[1..]);
            let search = fields.peek("search").unwrap_or_default().to_string();
            let kind = fields.peek("type").unwrap_or_default().to_string();
            Command::List {
                collection,
                search,
                kind,
            }
        }
        "tree" => Command::Tree {
            search: args.join(" "),
        },
        "show" => Command::Show(id_arg(args.first(), "show <id>")?),
        "add" | "new" => Command::Add {
            collection: collection_arg(args.first(), "add <collection> key=value ...")?,
            fields: Fields::parse(&args[1..]),
        },
        "edit" => Command::Edit {
            id: id_arg(args.first(), "edit <id> key=value ...")?,
            fields: Fields::parse(args.get(1..).unwrap_or_default()),
        },
        "rm" | "remove" | "delete" => Command::Remove(id_arg(args.first(), "rm <id>")?),
        "stats" => Command::Stats,
        "recent" => {
            let limit = match args.first() {
                Some(n) => n
                    .parse()
                    .with_context(|| format!("recent expects a number, got '{n}'"))?,
                None => RECENT_LIMIT,
            };
            Command::Recent(limit)
        }
        "types" => Command::Types,
        "links" => Command::Links(args.join(" ")),
        "export" => Command::Export,
        "quit" | "exit" => Command::Quit,
        other => bail!("Unknown command '{other}'. Type help for a list."),
    };
    Ok(command)
}

/// Run a command and return the lines to print.
pub fn execute(store: &mut Store, command: Command) -> Result<Vec<String>> {
    match command {
        Command::Help => Ok(HELP.iter().map(|s| s.to_string()).collect()),
        Command::Campaigns => Ok(campaigns(store)),
        Command::Use(id) => {
            store.select_scope(id.as_ref())?;
            Ok(vec![match store.current_campaign() {
                Some(c) => format!("[CAMPAIGN] {}", c.name),
                None => "[CAMPAIGN] none selected".to_string(),
            }])
        }
        Command::List {
            collection,
            search,
            kind,
        } => Ok(list(store, collection, &search, &kind)),
        Command::Tree { search } => Ok(tree(store, &search)),
        Command::Show(id) => {
            let entity = store
                .resolve_reference(&id)
                .ok_or_else(|| anyhow!("No record with id {id}"))?;
            Ok(describe(store, entity))
        }
        Command::Add { collection, fields } => add(store, collection, fields),
        Command::Edit { id, fields } => edit(store, &id, fields),
        Command::Remove(id) => remove(store, &id),
        Command::Stats => Ok(stats(store)),
        Command::Recent(limit) => Ok(store
            .recent_activity(limit)
            .into_iter()
            .map(|a| match a.at {
                Some(at) => format!("{}  ({})", a.title, at.format("%Y-%m-%d %H:%M")),
                None => a.title,
            })
            .collect()),
        Command::Types => Ok(Store::relationship_types()
            .iter()
            .map(|k| format!("{:<12} {}", k.as_str(), k.label()))
            .collect()),
        Command::Links(text) => Ok(store
            .link_entities(&text)
            .iter()
            .map(|id| format!("{id}  {}", store.display_name(id)))
            .collect()),
        Command::Export => Ok(vec![store.export_json()?]),
        Command::Quit => Ok(Vec::new()),
    }
}

// ============================================================================
// Views
// ============================================================================

fn campaigns(store: &Store) -> Vec<String> {
    let current = store.current_scope();
    store
        .query::<Campaign>()
        .iter()
        .map(|c| {
            let marker = if Some(&c.id) == current { '*' } else { ' ' };
            format!("{marker} {:<14} {}", c.id, c.name)
        })
        .collect()
}

fn row<T: Record>(record: &T) -> String {
    match record.category().filter(|c| !c.is_empty()) {
        Some(category) => format!("{:<14} {} [{category}]", record.id(), record.display_name()),
        None => format!("{:<14} {}", record.id(), record.display_name()),
    }
}

fn rows<T: Stored>(store: &Store, search: &str, kind: &str) -> Vec<String> {
    store
        .query::<T>()
        .search(search)
        .of_kind(kind)
        .iter()
        .map(row)
        .collect()
}

fn list(store: &Store, collection: CollectionName, search: &str, kind: &str) -> Vec<String> {
    let lines = match collection {
        CollectionName::Campaigns => return campaigns(store),
        CollectionName::Characters => rows::<Character>(store, search, kind),
        CollectionName::Locations => rows::<Location>(store, search, kind),
        CollectionName::Items => rows::<Item>(store, search, kind),
        CollectionName::Notes => store
            .query::<Note>()
            .search(search)
            .of_kind(kind)
            .newest_first()
            .iter()
            .map(|n| format!("{:<14} {} ({})", n.id, n.title, n.timestamp.format("%Y-%m-%d")))
            .collect(),
        CollectionName::Relationships => store
            .query::<Relationship>()
            .search(search)
            .of_kind(kind)
            .iter()
            .map(|r| {
                format!(
                    "{:<14} {} {} {} ({}/10)",
                    r.id,
                    store.display_name(&r.from),
                    r.kind.label().to_lowercase(),
                    store.display_name(&r.to),
                    r.strength
                )
            })
            .collect(),
    };

    if lines.is_empty() && store.current_scope().is_none() {
        return vec!["No campaign selected. Try: use <campaign-id>".to_string()];
    }
    lines
}

fn tree(store: &Store, search: &str) -> Vec<String> {
    let forest = store.location_tree(search);
    let mut lines: Vec<String> = forest
        .flatten()
        .into_iter()
        .map(|(depth, location)| {
            format!("{}{} ({})", "  ".repeat(depth), location.name, location.id)
        })
        .collect();
    for id in &forest.cycles {
        lines.push(format!("[WARN] parent cycle broken at {id}"));
    }
    lines
}

fn optional_name(store: &Store, id: Option<&EntityId>) -> String {
    id.map(|id| store.display_name(id).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn push_text(lines: &mut Vec<String>, label: &str, text: &str) {
    if !text.is_empty() {
        lines.push(format!("{label}: {text}"));
    }
}

fn push_tags(lines: &mut Vec<String>, tags: &[String]) {
    if !tags.is_empty() {
        lines.push(format!("Tags: {}", tags.join(", ")));
    }
}

fn push_relationships(store: &Store, lines: &mut Vec<String>, id: &EntityId) {
    for rel in store.relationships_of(id) {
        let (Some(kind), Some(other)) = (rel.kind_from(id), rel.other(id)) else {
            continue;
        };
        lines.push(format!(
            "  {} {} ({}/10)",
            kind.label(),
            store.display_name(other),
            rel.strength
        ));
    }
}

fn describe(store: &Store, entity: EntityRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    match entity {
        EntityRef::Campaign(c) => {
            lines.push(format!("{} ({})", c.name, c.id));
            push_text(&mut lines, "Description", &c.description);
            let created = c.created.map_or("-".to_string(), |d| d.to_string());
            let modified = c.last_modified.map_or("-".to_string(), |d| d.to_string());
            lines.push(format!("Created: {created}  Modified: {modified}"));
        }
        EntityRef::Character(c) => {
            lines.push(format!("{} ({}) [{}]", c.name, c.id, c.kind));
            let heritage = format!("{} {}", c.race, c.class);
            push_text(&mut lines, "Race/Class", heritage.trim());
            lines.push(format!("Location: {}", optional_name(store, c.location.as_ref())));
            push_text(&mut lines, "Description", &c.description);
            push_tags(&mut lines, &c.tags);
            lines.push("Relationships:".to_string());
            push_relationships(store, &mut lines, &c.id);
        }
        EntityRef::Location(l) => {
            lines.push(format!("{} ({}) [{}]", l.name, l.id, l.kind));
            lines.push(format!("Parent: {}", optional_name(store, l.parent.as_ref())));
            let children: Vec<&str> = store
                .children_of(&l.id)
                .into_iter()
                .map(|c| c.name.as_str())
                .collect();
            if !children.is_empty() {
                lines.push(format!("Contains: {}", children.join(", ")));
            }
            push_text(&mut lines, "Description", &l.description);
            push_tags(&mut lines, &l.tags);
        }
        EntityRef::Item(i) => {
            let magic = if i.magical { " (magical)" } else { "" };
            lines.push(format!("{} ({}) [{}]{magic}", i.name, i.id, i.kind));
            lines.push(format!("Owner: {}", optional_name(store, i.owner.as_ref())));
            lines.push(format!("Location: {}", optional_name(store, i.location.as_ref())));
            push_text(&mut lines, "Description", &i.description);
            push_tags(&mut lines, &i.tags);
        }
        EntityRef::Note(n) => {
            lines.push(format!("{} ({})", n.title, n.id));
            lines.push(format!("Written: {}", n.timestamp.format("%Y-%m-%d %H:%M")));
            if let Some(modified) = n.last_modified {
                lines.push(format!("Modified: {}", modified.format("%Y-%m-%d %H:%M")));
            }
            push_tags(&mut lines, &n.tags);
            if !n.linked_entities.is_empty() {
                let names: Vec<&str> = n
                    .linked_entities
                    .iter()
                    .map(|id| store.display_name(id))
                    .collect();
                lines.push(format!("Mentions: {}", names.join(", ")));
            }
            lines.push(String::new());
            lines.extend(n.content.lines().map(str::to_string));
        }
        EntityRef::Relationship(r) => {
            lines.push(format!(
                "{} {} {} ({})",
                store.display_name(&r.from),
                r.kind.label().to_lowercase(),
                store.display_name(&r.to),
                r.id
            ));
            lines.push(format!("Strength: {}/10", r.strength));
            push_text(&mut lines, "Description", &r.description);
        }
    }
    lines
}

fn stats(store: &Store) -> Vec<String> {
    let Some(campaign) = store.current_campaign() else {
        return vec!["No campaign selected.".to_string()];
    };
    let stats = store.stats();
    vec![
        format!("Campaign: {}", campaign.name),
        format!("Characters:    {}", stats.characters),
        format!("Locations:     {}", stats.locations),
        format!("Items:         {}", stats.items),
        format!("Notes:         {}", stats.notes),
        format!("Relationships: {}", stats.relationships),
    ]
}

// ============================================================================
// Mutations
// ============================================================================

fn created<T: Record>(record: &T) -> Vec<String> {
    vec![format!(
        "[CREATED] {} {}",
        record.id(),
        record.display_name()
    )]
}

fn add(store: &mut Store, collection: CollectionName, fields: Fields) -> Result<Vec<String>> {
    let lines = match collection {
        CollectionName::Campaigns => created(&store.create(forms::campaign_draft(fields)?)?),
        CollectionName::Characters => created(&store.create(forms::character_draft(fields)?)?),
        CollectionName::Locations => created(&store.create(forms::location_draft(fields)?)?),
        CollectionName::Items => created(&store.create(forms::item_draft(fields)?)?),
        CollectionName::Notes => {
            let note = store.create(forms::note_draft(fields)?)?;
            let mut lines = created(&note);
            if !note.linked_entities.is_empty() {
                let names: Vec<&str> = note
                    .linked_entities
                    .iter()
                    .map(|id| store.display_name(id))
                    .collect();
                lines.push(format!("Linked: {}", names.join(", ")));
            }
            lines
        }
        CollectionName::Relationships => {
            created(&store.create(forms::relationship_draft(fields)?)?)
        }
    };
    Ok(lines)
}

fn updated<T: Record>(record: &T) -> Vec<String> {
    vec![format!(
        "[UPDATED] {} {}",
        record.id(),
        record.display_name()
    )]
}

fn edit(store: &mut Store, id: &EntityId, fields: Fields) -> Result<Vec<String>> {
    let collection = store
        .resolve_reference(id)
        .map(|r| r.collection())
        .ok_or_else(|| anyhow!("No record with id {id}"))?;

    let lines = match collection {
        CollectionName::Campaigns => updated(&store.update(id, forms::campaign_patch(fields)?)?),
        CollectionName::Characters => updated(&store.update(id, forms::character_patch(fields)?)?),
        CollectionName::Locations => updated(&store.update(id, forms::location_patch(fields)?)?),
        CollectionName::Items => updated(&store.update(id, forms::item_patch(fields)?)?),
        CollectionName::Notes => updated(&store.update(id, forms::note_patch(fields)?)?),
        CollectionName::Relationships => {
            updated(&store.update(id, forms::relationship_patch(fields)?)?)
        }
    };
    Ok(lines)
}

fn removed<T: Record>(record: Option<T>) -> Vec<String> {
    match record {
        Some(r) => vec![format!("[REMOVED] {} {}", r.id(), r.display_name())],
        None => vec!["Nothing to remove.".to_string()],
    }
}

fn remove(store: &mut Store, id: &EntityId) -> Result<Vec<String>> {
    let Some(collection) = store.resolve_reference(id).map(|r| r.collection()) else {
        return Ok(vec![format!("No record with id {id}; nothing removed.")]);
    };

    let lines = match collection {
        CollectionName::Campaigns => removed(store.remove_campaign(id)?),
        CollectionName::Characters => removed(store.remove::<Character>(id)?),
        CollectionName::Locations => removed(store.remove::<Location>(id)?),
        CollectionName::Items => removed(store.remove::<Item>(id)?),
        CollectionName::Notes => removed(store.remove::<Note>(id)?),
        CollectionName::Relationships => removed(store.remove::<Relationship>(id)?),
    };
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::TestHarness;

    fn run(store: &mut Store, line: &str) -> Result<Vec<String>> {
        let words = tokenize(line)?;
        execute(store, parse(&words)?)
    }

    #[test]
    fn test_tokenize_quotes() {
        let words = tokenize(r#"add location name="Tresendar Manor" type='ruin' parent=location_1"#)
            .unwrap();
        assert_eq!(
            words,
            vec![
                "add",
                "location",
                "name=Tresendar Manor",
                "type=ruin",
                "parent=location_1"
            ]
        );
        assert!(tokenize("add note \"unfinished").is_err());
        assert_eq!(tokenize("edit x parent=\"\"").unwrap(), vec!["edit", "x", "parent="]);
    }

    #[test]
    fn test_parse_commands() {
        let words = tokenize("#list characters search=rock type=NPC").unwrap();
        assert_eq!(
            parse(&words).unwrap(),
            Command::List {
                collection: CollectionName::Characters,
                search: "rock".to_string(),
                kind: "NPC".to_string(),
            }
        );
        assert_eq!(parse(&tokenize("use none").unwrap()).unwrap(), Command::Use(None));
        assert_eq!(parse(&tokenize("recent").unwrap()).unwrap(), Command::Recent(RECENT_LIMIT));
        assert!(parse(&tokenize("list dragons").unwrap()).is_err());
        assert!(parse(&tokenize("dance").unwrap()).is_err());
    }

    #[test]
    fn test_mutating_commands() {
        assert!(Command::Remove(EntityId::from("x")).mutates());
        assert!(!Command::Stats.mutates());
    }

    #[test]
    fn test_list_and_search() {
        let mut harness = TestHarness::new();
        let lines = run(&mut harness.store, "list characters search=rock").unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Gundren Rockseeker"));
    }

    #[test]
    fn test_add_show_edit_remove() {
        let mut harness = TestHarness::new();
        let store = &mut harness.store;

        let lines = run(store, "add character Toblen Stonehill race=Human location=location_1").unwrap();
        assert!(lines[0].starts_with("[CREATED]"));
        let id = store
            .query::<Character>()
            .search("Toblen")
            .first()
            .map(|c| c.id.clone())
            .unwrap();

        let shown = run(store, &format!("show {id}")).unwrap();
        assert!(shown.iter().any(|l| l == "Location: Neverwinter"));

        run(store, &format!("edit {id} location=")).unwrap();
        assert_eq!(store.get::<Character>(&id).unwrap().location, None);

        let lines = run(store, &format!("rm {id}")).unwrap();
        assert!(lines[0].starts_with("[REMOVED]"));
        let lines = run(store, &format!("rm {id}")).unwrap();
        assert!(lines[0].contains("nothing removed"));
    }

    #[test]
    fn test_note_reports_links() {
        let mut harness = TestHarness::new();
        let lines = run(
            &mut harness.store,
            "add note Rumors content='Sildar Hallwinter was seen in Neverwinter'",
        )
        .unwrap();
        assert!(lines.iter().any(|l| l.starts_with("Linked:")
            && l.contains("Sildar Hallwinter")
            && l.contains("Neverwinter")));
    }

    #[test]
    fn test_tree_indents_children() {
        let mut harness = TestHarness::new();
        let lines = run(&mut harness.store, "tree").unwrap();
        assert!(lines.iter().any(|l| l.starts_with("Sword Coast")));
        assert!(lines.iter().any(|l| l.starts_with("  ")));
    }

    #[test]
    fn test_edit_unknown_id() {
        let mut harness = TestHarness::new();
        let err = run(&mut harness.store, "edit ghost name=Boo").unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_use_none_hides_records() {
        let mut harness = TestHarness::new();
        run(&mut harness.store, "use none").unwrap();
        let lines = run(&mut harness.store, "list characters").unwrap();
        assert_eq!(lines, vec!["No campaign selected. Try: use <campaign-id>"]);
    }
}
