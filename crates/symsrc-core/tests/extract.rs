//! Tests for definition extraction

use symsrc_core::extract::{LexicalExtractor, LineCountExtractor, SpanExtractor};

const ADD: &str = "int add(int a,\n  int b) {\n  return a + b;\n}\n";

const LIBC_EXCERPT: &str = r#"#include <string.h>

/* Copy n bytes; regions must not overlap. */
void *memcpy(void *restrict dest,
             const void *restrict src,
             size_t n)
{
	unsigned char *d = dest;
	const unsigned char *s = src;
	const char *note = "not a brace: }";
	char open = '{';
	// stray } in a comment
	for (; n; n--) *d++ = *s++;
	/* and { in a block comment
	   spanning } lines */
	return dest;
}

int after(void) { return 1; }
"#;

#[test]
fn test_extract_complete_function()
{
    let result = LexicalExtractor::new().extract("add", "add.c", ADD, 0).unwrap();

    assert_eq!(result.text, "int add(int a,\n  int b) {\n  return a + b;\n}");
    assert!(result.complete);
    assert_eq!((result.start_line, result.end_line), (1, 4));
    assert_eq!(result.source_file, "add.c");
}

#[test]
fn test_extract_truncated_file()
{
    let truncated = "int add(int a,\n  int b) {\n  return a + b;\n";
    let result = LexicalExtractor::new().extract("add", "add.c", truncated, 0).unwrap();

    assert_eq!(result.text, truncated);
    assert!(!result.complete);
    assert_eq!(result.start_line, 1);
}

#[test]
fn test_reported_line_inside_multiline_signature()
{
    // Debuggers report the line holding the name, not the return type
    let result = LexicalExtractor::new().extract("memcpy", "memcpy.c", LIBC_EXCERPT, 3).unwrap();

    assert!(result.text.starts_with("void *memcpy(void *restrict dest,"));
    assert!(result.text.ends_with("\treturn dest;\n}"));
    assert!(result.complete);
    assert_eq!((result.start_line, result.end_line), (4, 17));
    assert_eq!(
        result.signature(),
        "void *memcpy(void *restrict dest, const void *restrict src, size_t n)"
    );
}

#[test]
fn test_result_is_a_slice_of_the_source()
{
    let extractor = LexicalExtractor::new();
    for line in [3, 4, 5, 6] {
        let result = extractor.extract("memcpy", "memcpy.c", LIBC_EXCERPT, line).unwrap();
        let offset = LIBC_EXCERPT.find(&result.text).unwrap();
        let prefix_lines = LIBC_EXCERPT[..offset].matches('\n').count();
        assert_eq!(prefix_lines + 1, result.start_line as usize);
        assert!(result.text.ends_with("return dest;\n}"));
    }
}

#[test]
fn test_extraction_is_deterministic()
{
    let extractor = LexicalExtractor::new();
    let first = extractor.extract("memcpy", "memcpy.c", LIBC_EXCERPT, 3);
    let second = extractor.extract("memcpy", "memcpy.c", LIBC_EXCERPT, 3);
    assert_eq!(first, second);
}

#[test]
fn test_no_body_is_none()
{
    let prototype = "int add(int a, int b);\nint x;\n";
    assert!(LexicalExtractor::new().extract("add", "add.h", prototype, 0).is_none());
    assert!(LexicalExtractor::new().extract("add", "add.c", ADD, 40).is_none());
}

#[test]
fn test_one_line_function()
{
    let result = LexicalExtractor::new().extract("after", "memcpy.c", LIBC_EXCERPT, 18).unwrap();
    assert_eq!(result.text, "int after(void) { return 1; }");
    assert_eq!((result.start_line, result.end_line), (19, 19));
}

#[test]
fn test_line_count_extractor_is_fooled_by_literals()
{
    // The literal `}` closes the count early; the lexical scanner is not fooled
    let lexical = LexicalExtractor::new().extract("memcpy", "memcpy.c", LIBC_EXCERPT, 3).unwrap();
    let counted = LineCountExtractor::new().extract("memcpy", "memcpy.c", LIBC_EXCERPT, 3).unwrap();

    assert!(counted.text.len() < lexical.text.len());
    assert!(counted.text.starts_with("void *memcpy"));
}

#[test]
fn test_line_count_extractor_simple_function()
{
    let result = LineCountExtractor::new().extract("add", "add.c", ADD, 0).unwrap();
    assert_eq!(result.text, "int add(int a,\n  int b) {\n  return a + b;\n}");
    assert!(result.complete);
}

const GUARDED: &str = "\
#include <stddef.h>

static int counter; // calls
int a(void) {
  return 0;
} // end a
#if defined(FAST)
/* picks the wider type */
static inline
int
add(int a, /* left */
    int b) // sum
{
  counter++; // count { calls
  return a + b; /* } */
}
#endif
int tail; // after
";

const NEIGHBOURS: &str = "\
int a(void) {
  return 0;
} // end a
unsigned long
sum(const int *v, /* values */
    size_t n)
{
  unsigned long total = 0; // running
  while (n--) total += *v++;
  return total;
}
static int counter; // calls

int b(void) { return counter; } // one line
static int counter; // calls
int c(void)
{
  return counter;
}
";

#[test]
fn test_function_among_comments_and_directives()
{
    // (source, first line, last line, reported lines), all 0-based
    let cases: [(&str, usize, usize, std::ops::RangeInclusive<usize>); 5] = [
        (GUARDED, 8, 15, 8..=12),
        (GUARDED, 3, 5, 3..=3),
        (NEIGHBOURS, 3, 10, 3..=6),
        (NEIGHBOURS, 13, 13, 13..=13),
        (NEIGHBOURS, 15, 18, 15..=16),
    ];
    let extractor = LexicalExtractor::new();

    for (source, first, last, reported) in cases {
        let lines: Vec<&str> = source.lines().collect();
        let mut expected = lines[first..=last].join("\n");
        if let Some(comment) = expected.rfind("} //") {
            expected.truncate(comment + 1);
        }

        for line in reported {
            let result = extractor.extract("f", "f.c", source, line).unwrap();
            assert_eq!(result.text, expected, "reported line {line}");
            assert_eq!(result.start_line as usize, first + 1);
            assert_eq!(result.end_line as usize, last + 1);
            assert!(result.complete);
        }
    }
}
