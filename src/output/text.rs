//! Human-readable text report.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::ScanResult;

/// Plain text formatter for terminal output.
pub struct TextOutput<'a> {
    result: &'a ScanResult,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(result: &'a ScanResult) -> Self {
        Self { result }
    }

    /// Write the summary followed by every group, largest waste first.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        let r = self.result;

        writeln!(w, "Scan of {} ({})", r.root.display(), r.status)?;
        writeln!(w, "  Algorithm:          {}", r.algorithm)?;
        writeln!(w, "  Files scanned:      {}", r.total_files)?;
        writeln!(w, "  Total size:         {}", ByteSize::b(r.total_size_bytes))?;
        writeln!(w, "  Duplicate groups:   {}", r.group_count())?;
        writeln!(w, "  Duplicate files:    {}", r.duplicate_file_count())?;
        writeln!(w, "  Reclaimable space:  {}", ByteSize::b(r.reclaimable_bytes()))?;
        writeln!(w, "  Elapsed:            {:.2}s", r.elapsed.as_secs_f64())?;
        if !r.errors.is_empty() {
            writeln!(w, "  Errors:             {}", r.errors.len())?;
        }

        if r.is_cancelled() {
            writeln!(w)?;
            writeln!(w, "Scan was cancelled; results are partial.")?;
        }

        for (idx, group) in r.groups_by_wasted_space().into_iter().enumerate() {
            writeln!(w)?;
            writeln!(
                w,
                "Group {} - {} x {} ({} wasted) [{}]",
                idx + 1,
                group.len(),
                ByteSize::b(group.size()),
                ByteSize::b(group.wasted_space()),
                group.digest()
            )?;
            for path in &group.files {
                writeln!(w, "    {}", path.display())?;
            }
        }

        if !r.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for err in &r.errors {
                writeln!(w, "    {err}")?;
            }
        }

        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
