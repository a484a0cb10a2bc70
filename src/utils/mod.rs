pub mod time;

/// Generate a url-safe unique id, used for run ids.
pub fn longid() -> String {
    nanoid::nanoid!()
}
