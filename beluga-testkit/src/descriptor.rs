use beluga::{JobDescriptor, WorkerOptions};

/// Build a descriptor mapping `/videos/{name}.mp4` to `/subs/{name}.srt`
/// with default worker options.
pub fn descriptor(name: &str) -> JobDescriptor {
    descriptor_with_options(name, WorkerOptions::default())
}

/// Build a descriptor with explicit worker options.
pub fn descriptor_with_options(name: &str, options: WorkerOptions) -> JobDescriptor {
    JobDescriptor::new(
        format!("/videos/{name}.mp4"),
        format!("/subs/{name}.srt"),
        options,
    )
}

/// Build `count` descriptors named `job-0` through `job-{count-1}`, in
/// submission order.
pub fn numbered_batch(count: usize) -> Vec<JobDescriptor> {
    (0..count).map(|i| descriptor(&format!("job-{i}"))).collect()
}
