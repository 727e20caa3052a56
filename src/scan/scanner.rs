use std::collections::HashMap;
use std::time::Instant;

use crate::dom::{Document, NodeId};
use crate::locator::{is_unique, synthesize};
use crate::scan::classifier::classify;
use crate::scan::config::{CompiledFilters, ScanConfig};
use crate::scan::extract::{self, ElementFacts, LabelIndex};
use crate::scan::scan_model::{
    DescriptorMetadata, ElementDescriptor, ElementType, ElementValue, ScanMetadata, ScanOutput,
};

#[derive(Debug, Clone)]
struct CacheEntry {
    hash: String,
    /// Document generation at which the selectors were last known unique.
    generation: u64,
    /// The element's descriptor, followed by its option descriptors for selects.
    descriptors: Vec<ElementDescriptor>,
}

/// Bounded tree walker with a per-node change-detection cache.
#[derive(Debug, Default)]
pub struct Scanner {
    cache: HashMap<NodeId, CacheEntry>,
    last_hits: usize,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan from the configured root selectors, else from the document body.
    pub fn scan(&mut self, doc: &Document, config: &ScanConfig) -> ScanOutput {
        self.run(doc, None, config)
    }

    /// Scan from an explicit root. Root selectors in `config` still take
    /// precedence when present.
    pub fn scan_from(&mut self, doc: &Document, root: NodeId, config: &ScanConfig) -> ScanOutput {
        self.run(doc, Some(root), config)
    }

    /// Descriptor for a single element, ignoring every filter.
    pub fn describe(&mut self, doc: &Document, node: NodeId) -> Option<ElementDescriptor> {
        if !doc.is_element(node) {
            return None;
        }
        let config = ScanConfig::default();
        let filters = config.compile();
        let depth = doc.ancestors(node).len();
        let mut walk = Walk::new(doc, &config, &filters, &mut self.cache);
        walk.describe(node, depth).into_iter().next()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Elements served from the cache during the most recent scan.
    pub fn cache_hits(&self) -> usize {
        self.last_hits
    }

    fn prune_cache(&mut self, doc: &Document) {
        let before = self.cache.len();
        self.cache.retain(|&node, _| doc.is_connected(node));
        let dropped = before - self.cache.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned cache entries for detached nodes");
        }
    }

    fn run(&mut self, doc: &Document, root: Option<NodeId>, config: &ScanConfig) -> ScanOutput {
        let started = Instant::now();
        if config.defer {
            tracing::debug!("defer hint ignored, scanning synchronously");
        }

        let filters = config.compile();
        let roots = resolve_roots(doc, root, &filters);
        self.prune_cache(doc);

        let mut walk = Walk::new(doc, config, &filters, &mut self.cache);
        for root in roots {
            walk.visit(root, 0);
        }
        let Walk {
            elements,
            partial,
            hits,
            ..
        } = walk;
        self.last_hits = hits;

        let metadata = ScanMetadata {
            element_count: elements.len(),
            depth_used: config.depth,
            duration_ms: started.elapsed().as_millis() as u64,
            partial,
        };
        tracing::info!(
            elements = metadata.element_count,
            cache_hits = hits,
            partial,
            duration_ms = metadata.duration_ms,
            "scan complete"
        );

        ScanOutput { elements, metadata }
    }
}

fn resolve_roots(doc: &Document, root: Option<NodeId>, filters: &CompiledFilters) -> Vec<NodeId> {
    if !filters.root_selectors.is_empty() {
        let mut roots = Vec::new();
        for selector in &filters.root_selectors {
            match doc.query_selector_all(selector) {
                Ok(found) => roots.extend(found),
                Err(e) => tracing::warn!(%selector, error = %e, "ignoring invalid root selector"),
            }
        }
        return roots;
    }
    root.or_else(|| doc.body())
        .or_else(|| doc.document_element())
        .into_iter()
        .collect()
}

struct Walk<'a> {
    doc: &'a Document,
    config: &'a ScanConfig,
    filters: &'a CompiledFilters,
    cache: &'a mut HashMap<NodeId, CacheEntry>,
    labels: LabelIndex,
    now_ms: u64,
    elements: Vec<ElementDescriptor>,
    partial: bool,
    hits: usize,
}

impl<'a> Walk<'a> {
    fn new(
        doc: &'a Document,
        config: &'a ScanConfig,
        filters: &'a CompiledFilters,
        cache: &'a mut HashMap<NodeId, CacheEntry>,
    ) -> Self {
        Self {
            doc,
            config,
            filters,
            cache,
            labels: LabelIndex::build(doc),
            now_ms: doc.now().as_millis() as u64,
            elements: Vec::new(),
            partial: false,
            hits: 0,
        }
    }

    fn visit(&mut self, node: NodeId, depth: usize) {
        if depth > self.config.depth || self.partial {
            return;
        }
        let Some(tag) = self.doc.tag_name(node) else {
            return;
        };

        if self
            .filters
            .exclude_selectors
            .iter()
            .any(|s| self.doc.matches_selector(node, s))
        {
            tracing::debug!(%node, tag, "excluded subtree");
            return;
        }

        match self.skip_reason(node, tag) {
            Some(reason) => tracing::trace!(%node, tag, reason, "skipped element"),
            None => self.admit(node, depth),
        }

        // select options are materialized with their select
        if matches!(tag, "select" | "datalist") {
            return;
        }
        for child in self.doc.element_children(node) {
            self.visit(child, depth + 1);
        }
    }

    fn skip_reason(&self, node: NodeId, tag: &str) -> Option<&'static str> {
        let filters = self.filters;

        if filters.exclude_elements.iter().any(|t| t == tag) {
            return Some("excluded element type");
        }

        let needs_info = !filters.exclude_patterns.is_empty() || !filters.include_patterns.is_empty();
        let info = if needs_info {
            extract::info_string(self.doc, node)
        } else {
            String::new()
        };

        if filters.exclude_patterns.iter().any(|re| re.is_match(&info)) {
            return Some("excluded pattern");
        }
        if !filters.include_elements.is_empty() && !filters.include_elements.iter().any(|t| t == tag) {
            return Some("element type not included");
        }
        if !filters.include_patterns.is_empty() && !filters.include_patterns.iter().any(|re| re.is_match(&info)) {
            return Some("no include pattern matched");
        }
        if !self.config.include_hidden && !extract::is_visible(self.doc, node) {
            return Some("hidden");
        }
        if !self.config.include_disabled && !extract::is_enabled(self.doc, node) {
            return Some("disabled");
        }
        if let Some(predicate) = &self.config.predicate {
            if !predicate.test(self.doc, node) {
                return Some("rejected by predicate");
            }
        }
        None
    }

    fn admit(&mut self, node: NodeId, depth: usize) {
        if self.elements.len() >= self.config.max_elements {
            self.partial = true;
            return;
        }
        for descriptor in self.describe(node, depth) {
            if self.elements.len() >= self.config.max_elements {
                self.partial = true;
                break;
            }
            self.elements.push(descriptor);
        }
    }

    fn describe(&mut self, node: NodeId, depth: usize) -> Vec<ElementDescriptor> {
        let doc = self.doc;
        let hash = extract::fingerprint(doc, node, &self.labels);
        let generation = doc.generation();

        if let Some(entry) = self.cache.get_mut(&node).filter(|e| e.hash == hash) {
            // selectors only go stale through attribute or tree changes
            let still_resolves = entry.generation == generation
                || entry
                    .descriptors
                    .iter()
                    .all(|d| d.node.is_some_and(|n| is_unique(doc, &d.selector, n)));
            if still_resolves {
                entry.generation = generation;
                self.hits += 1;
                let shift = depth as isize - entry.descriptors[0].metadata.depth as isize;
                for descriptor in &mut entry.descriptors {
                    descriptor.metadata.last_updated = self.now_ms;
                    descriptor.metadata.depth = (descriptor.metadata.depth as isize + shift).max(0) as usize;
                }
                tracing::debug!(%node, "cache hit");
                return entry.descriptors.clone();
            }
        }

        let element_type = classify(doc, node);
        let facts = ElementFacts::collect(doc, node, element_type);
        let selector = synthesize(doc, node);
        let mut descriptors = Vec::new();
        let visible = facts.visible;
        let has_options = facts.options.is_some();
        descriptors.push(self.build(node, selector.clone(), facts, hash.clone(), depth));
        if has_options {
            descriptors.extend(self.option_descriptors(node, &selector, visible, depth));
        }

        self.cache.insert(
            node,
            CacheEntry {
                hash,
                generation,
                descriptors: descriptors.clone(),
            },
        );
        descriptors
    }

    fn build(
        &self,
        node: NodeId,
        selector: String,
        facts: ElementFacts,
        hash: String,
        depth: usize,
    ) -> ElementDescriptor {
        let select_metadata = facts
            .options
            .as_ref()
            .map(|options| extract::select_metadata(self.doc, node, options));
        let bounds = facts.visible.then(|| self.doc.bounding_box(node));

        ElementDescriptor {
            id: descriptor_id(self.doc, node),
            element_type: facts.element_type,
            tag: facts.tag,
            selector,
            label: facts.label,
            attributes: facts.attributes,
            value: facts.value,
            text: facts.text,
            visible: facts.visible,
            enabled: facts.enabled,
            options: facts.options,
            select_metadata,
            bounds,
            metadata: DescriptorMetadata {
                hash,
                last_updated: self.now_ms,
                depth,
            },
            node: Some(node),
        }
    }

    fn option_descriptors(
        &self,
        select: NodeId,
        select_selector: &str,
        select_visible: bool,
        depth: usize,
    ) -> Vec<ElementDescriptor> {
        let doc = self.doc;
        let mut out = Vec::new();

        for option in doc.options(select) {
            let position = doc.element_index(option);
            let (selector, option_depth) = match doc.parent_element(option) {
                Some(group) if group != select => (
                    format!(
                        "{select_selector} > optgroup:nth-child({}) > option:nth-child({position})",
                        doc.element_index(group)
                    ),
                    depth + 2,
                ),
                _ => (
                    format!("{select_selector} > option:nth-child({position})"),
                    depth + 1,
                ),
            };

            let mut facts = ElementFacts::collect(doc, option, ElementType::Other);
            facts.label = extract::option_label(doc, option);
            facts.value = doc.value(option).map(ElementValue::Text);
            facts.visible = select_visible;
            let hash = extract::fingerprint(doc, option, &self.labels);

            let mut descriptor = self.build(option, selector, facts, hash, option_depth);
            descriptor.bounds = None;
            out.push(descriptor);
        }
        out
    }
}

fn descriptor_id(doc: &Document, node: NodeId) -> String {
    doc.id_attribute(node)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("pc-{}", node.index()))
}
