use super::*;
use crate::{
    render::{CpuRenderer, color_for_text},
    session::{MemoryAvatarService, MemoryRoster},
};

fn setup() -> (DirectoryNameSource, Arc<MemoryRoster>, Session) {
    let roster = Arc::new(MemoryRoster::new());
    let session = Session::new(Arc::new(MemoryAvatarService::new()), roster.clone());
    let source = DirectoryNameSource::new(Arc::new(CpuRenderer::new()), AvatarFont::none(), 8);
    source.prepare_session(&session);
    (source, roster, session)
}

#[test]
fn unknown_or_unnamed_contacts_miss() {
    let (source, roster, _session) = setup();
    let font = AvatarFont::none();
    let benvolio = Address::new("benvolio@montague.lit");
    assert!(source.get_cached(&benvolio, &font).unwrap_err().is_not_cached());

    roster.add(benvolio.clone(), None);
    assert!(source.get_cached(&benvolio, &font).unwrap_err().is_not_cached());
    assert!(!source.has_entry(&benvolio));
}

#[test]
fn named_contact_gets_glyph_from_name_and_colour_from_address() {
    let (source, roster, _session) = setup();
    let juliet = Address::new("juliet@capulet.lit");
    roster.add(juliet.clone(), Some("Juliet"));

    let entry = source.get_cached(&juliet, &AvatarFont::none()).unwrap();
    let picture = entry.picture().unwrap();
    assert_eq!(picture.grapheme(), Some("J"));
    assert_eq!(picture.color(), Some(color_for_text("juliet@capulet.lit")));
}

#[test]
fn rename_changes_glyph() {
    let (source, roster, _session) = setup();
    let juliet = Address::new("juliet@capulet.lit");
    roster.add(juliet.clone(), Some("Juliet"));
    roster.rename(&juliet, Some("Capulet, J."));

    let entry = source.get_cached(&juliet, &AvatarFont::none()).unwrap();
    assert_eq!(entry.picture().unwrap().grapheme(), Some("C"));
}

#[test]
fn every_roster_event_is_forwarded_as_upstream_change() {
    let (source, roster, session) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    source
        .on_avatar_changed()
        .connect(move |c: &SourceChange| sink.lock().unwrap().push(c.clone()));

    let juliet = Address::new("juliet@capulet.lit");
    roster.add(juliet.clone(), Some("Juliet"));
    roster.rename(&juliet, Some("Jules"));
    roster.remove(&juliet);
    source.shutdown_session(&session);
    roster.add(juliet.clone(), Some("Juliet"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|c| *c == SourceChange::upstream(juliet.clone())));
}

#[tokio::test]
async fn fetch_reports_absent_for_unknown_contacts() {
    let (source, roster, _session) = setup();
    let romeo = Address::new("romeo@montague.lit");
    assert!(source.fetch(&romeo).await.unwrap().is_absent());
    roster.add(romeo.clone(), Some("Romeo"));
    assert!(source.fetch(&romeo).await.unwrap().picture().is_some());
}
